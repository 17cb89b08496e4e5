// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the capture screen.
//
// Every technical error is mapped to plain language with a clear suggestion.
// Only camera problems stop a capture session; everything else is phrased so
// the user knows they can keep going.

use crate::error::LedgercamError;

/// How serious an error looks to the person holding the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A hiccup the app recovers from by itself.
    Transient,
    /// The user must do something (grant permission, close another camera app).
    ActionRequired,
    /// Cannot be fixed by retrying on this device.
    Permanent,
}

/// A human-readable error with plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary (shown as a heading).
    pub message: String,
    /// Next step for the user.
    pub suggestion: String,
    /// Whether trying the same action again can succeed.
    pub retriable: bool,
    /// Picks the icon and colour on the capture screen.
    pub severity: Severity,
}

/// Convert a `LedgercamError` into a `HumanError` anyone can act on.
pub fn humanize_error(err: &LedgercamError) -> HumanError {
    match err {
        // -- Camera --
        LedgercamError::CameraPermissionDenied => HumanError {
            message: "The camera couldn't be started.".into(),
            suggestion: "Allow camera access for this app in your device or browser settings, then open the camera again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        LedgercamError::CameraUnavailable(detail) => {
            if detail.to_ascii_lowercase().contains("busy") || detail.to_ascii_lowercase().contains("in use") {
                HumanError {
                    message: "Another app is using the camera.".into(),
                    suggestion: "Close any other app that uses the camera, then try again.".into(),
                    retriable: true,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "No camera was found.".into(),
                    suggestion: "You can still attach a photo of the receipt from your files instead.".into(),
                    retriable: false,
                    severity: Severity::Permanent,
                }
            }
        }

        LedgercamError::CameraLost(_) => HumanError {
            message: "The camera stopped working.".into(),
            suggestion: "Close the camera and open it again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        LedgercamError::EngineTimeout { .. } => HumanError {
            message: "Automatic edge detection isn't available right now.".into(),
            suggestion: "You can still take the photo. It will be saved without straightening.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Image pipeline --
        LedgercamError::ImageError(_) => HumanError {
            message: "This photo couldn't be processed.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try taking the photo again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        LedgercamError::EncodeError(_) => HumanError {
            message: "The photo couldn't be saved.".into(),
            suggestion: "Try taking the photo again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Collaborators --
        LedgercamError::OcrError(_) => HumanError {
            message: "The receipt text couldn't be read automatically.".into(),
            suggestion: "Please enter the date, amount, and payee by hand.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        LedgercamError::UploadError(_) => HumanError {
            message: "The photo couldn't be uploaded.".into(),
            suggestion: "Check your connection and try saving again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        LedgercamError::HandoffError(_) => HumanError {
            message: "The photo couldn't be attached to the form.".into(),
            suggestion: "Close the camera, reopen the form, and take the photo again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Session --
        LedgercamError::SessionClosed => HumanError {
            message: "The camera has been closed.".into(),
            suggestion: "Open the camera again to take another photo.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        LedgercamError::InvalidConfig(detail) => HumanError {
            message: "The capture settings are invalid.".into(),
            suggestion: format!("Reset the capture settings to their defaults. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Storage --
        LedgercamError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The photo file is missing.".into(),
                suggestion: "Pick the photo again, or take a new one.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "Ledgercam isn't allowed to open that photo.".into(),
                suggestion: "Grant access to the photo folder, then try again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "A photo couldn't be read from or written to storage.".into(),
                suggestion: "Free up some space and try again.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        LedgercamError::Serialization(_) => HumanError {
            message: "Some capture data was malformed.".into(),
            suggestion: "Try the capture again. Report it if the problem persists.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Platform --
        LedgercamError::Bridge(_) => HumanError {
            message: "The camera or a device service stopped responding.".into(),
            suggestion: "Close the camera and open it again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        LedgercamError::PlatformUnavailable => HumanError {
            message: "No camera is available on this device.".into(),
            suggestion: "Attach a photo from your files instead.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_needs_user_action() {
        let human = humanize_error(&LedgercamError::CameraPermissionDenied);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn busy_camera_is_retriable() {
        let human = humanize_error(&LedgercamError::CameraUnavailable("device busy".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.retriable);
    }

    #[test]
    fn missing_camera_is_permanent() {
        let human = humanize_error(&LedgercamError::CameraUnavailable("no video input".into()));
        assert_eq!(human.severity, Severity::Permanent);
    }

    #[test]
    fn engine_timeout_still_allows_capture() {
        let human = humanize_error(&LedgercamError::EngineTimeout { waited_ms: 30_000 });
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.suggestion.contains("still take the photo"));
    }

    #[test]
    fn missing_file_is_action_required() {
        let err = LedgercamError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }
}
