//! Small shared UI enums.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusArea {
    /// The message composer under the transcript.
    Composer,
    /// The model list in the sidebar.
    Models,
}

impl FocusArea {
    pub fn label(&self) -> &'static str {
        match self {
            FocusArea::Composer => "Composer",
            FocusArea::Models => "Models",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            FocusArea::Composer => FocusArea::Models,
            FocusArea::Models => FocusArea::Composer,
        }
    }
}

/// Tone of the status bar message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoticeKind {
    #[default]
    Info,
    Success,
    Error,
}
