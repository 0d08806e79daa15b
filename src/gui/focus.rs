//! Focus tracking for text fields.
//!
//! iced text inputs report edits and submits but not focus loss, so a field
//! counts as blurred when it is submitted, when another field is edited, or
//! when the user presses a button that acts on the form.

/// Form fields whose blur matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    BaseUrl,
    Model,
    ApiKey,
    DeviceId,
    Task,
}

impl Field {
    /// Whether a blur on this field should trigger a credential check.
    pub fn is_api_field(self) -> bool {
        matches!(self, Field::BaseUrl | Field::Model | Field::ApiKey)
    }
}

/// Remembers which field is being edited.
#[derive(Debug, Clone, Default)]
pub struct FocusTracker {
    current: Option<Field>,
}

impl FocusTracker {
    /// Record an edit; returns the field that lost focus, if any.
    pub fn edit(&mut self, field: Field) -> Option<Field> {
        match self.current.replace(field) {
            Some(previous) if previous != field => Some(previous),
            _ => None,
        }
    }

    /// Record a submit (Enter); the field is blurred.
    pub fn submit(&mut self, field: Field) -> Field {
        if self.current == Some(field) {
            self.current = None;
        }
        field
    }

    /// Leave the form entirely; returns the field that lost focus, if any.
    pub fn leave(&mut self) -> Option<Field> {
        self.current.take()
    }
}
