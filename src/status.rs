//! User-facing session state: the status line, the start control and the
//! one-time instruction panel.

use std::fmt;

/// Load and tracking state shown in the status line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrackingStatus {
    #[default]
    Booting,
    AvatarLoaded {
        head_found: bool,
    },
    AvatarLoadFailed,
    RequestingCamera,
    TrackingActive,
    CameraFailed(String),
}

impl TrackingStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::AvatarLoadFailed | Self::CameraFailed(_))
    }
}

impl fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Booting => write!(f, "Loading avatar…"),
            Self::AvatarLoaded { head_found: true } => {
                write!(f, "Avatar loaded (Head found). Click Start Camera")
            }
            Self::AvatarLoaded { head_found: false } => {
                write!(f, "Avatar loaded (NO HEAD BONE). Check console.")
            }
            Self::AvatarLoadFailed => write!(f, "Failed to load avatar.glb"),
            Self::RequestingCamera => write!(f, "Requesting camera…"),
            Self::TrackingActive => write!(f, "Tracking active"),
            Self::CameraFailed(msg) if msg.is_empty() => write!(f, "Camera failed: unknown error"),
            Self::CameraFailed(msg) => write!(f, "Camera failed: {}", msg),
        }
    }
}

/// Start button lifecycle.
///
/// Disabled while a camera request is in flight, stays disabled once
/// tracking has started, and re-enables after a failure for a manual retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartControl {
    #[default]
    Idle,
    InFlight,
    Started,
}

impl StartControl {
    pub fn is_enabled(self) -> bool {
        self == Self::Idle
    }

    /// Returns false if a request is already running or tracking already started.
    pub fn begin(&mut self) -> bool {
        if *self != Self::Idle {
            return false;
        }
        *self = Self::InFlight;
        true
    }

    pub fn succeed(&mut self) {
        if *self == Self::InFlight {
            *self = Self::Started;
        }
    }

    pub fn fail(&mut self) {
        if *self == Self::InFlight {
            *self = Self::Idle;
        }
    }

    /// Back to idle after tracking is stopped.
    pub fn reset(&mut self) {
        *self = Self::Idle;
    }
}

/// One-time instruction panel shown until dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionPanel {
    visible: bool,
}

impl Default for InstructionPanel {
    fn default() -> Self {
        Self { visible: true }
    }
}

impl InstructionPanel {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn dismiss(&mut self) {
        self.visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(
            TrackingStatus::AvatarLoaded { head_found: true }.to_string(),
            "Avatar loaded (Head found). Click Start Camera"
        );
        assert_eq!(
            TrackingStatus::AvatarLoaded { head_found: false }.to_string(),
            "Avatar loaded (NO HEAD BONE). Check console."
        );
        assert_eq!(TrackingStatus::AvatarLoadFailed.to_string(), "Failed to load avatar.glb");
        assert_eq!(TrackingStatus::TrackingActive.to_string(), "Tracking active");
        assert_eq!(
            TrackingStatus::CameraFailed("Permission denied".into()).to_string(),
            "Camera failed: Permission denied"
        );
        assert_eq!(
            TrackingStatus::CameraFailed(String::new()).to_string(),
            "Camera failed: unknown error"
        );
    }

    #[test]
    fn test_errors_flagged() {
        assert!(TrackingStatus::AvatarLoadFailed.is_error());
        assert!(TrackingStatus::CameraFailed("x".into()).is_error());
        assert!(!TrackingStatus::RequestingCamera.is_error());
    }

    #[test]
    fn test_start_control_blocks_while_in_flight() {
        let mut start = StartControl::default();
        assert!(start.is_enabled());
        assert!(start.begin());
        assert!(!start.is_enabled());
        assert!(!start.begin());

        start.fail();
        assert!(start.is_enabled());
        assert!(start.begin());
        start.succeed();
        assert_eq!(start, StartControl::Started);
        // Idempotent after success
        assert!(!start.begin());
        start.fail();
        assert_eq!(start, StartControl::Started);
    }

    #[test]
    fn test_instruction_panel_dismiss() {
        let mut panel = InstructionPanel::default();
        assert!(panel.is_visible());
        panel.dismiss();
        panel.dismiss();
        assert!(!panel.is_visible());
    }
}
