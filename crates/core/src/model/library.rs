use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LibraryError {
    #[error("library item id cannot be empty")]
    EmptyId,

    #[error("library item title cannot be empty")]
    EmptyTitle,

    #[error("cannot begin a download while {state}")]
    NotAvailable { state: DownloadState },

    #[error("no download in progress, item is {state}")]
    NotDownloading { state: DownloadState },

    #[error("nothing to remove, item is {state}")]
    NotRemovable { state: DownloadState },

    #[error("download progress cannot exceed 100, got {percent}")]
    PercentOutOfRange { percent: u8 },

    #[error("download progress cannot move backwards from {from} to {to}")]
    ProgressWentBackwards { from: u8, to: u8 },
}

//
// ─── DOWNLOAD STATE ────────────────────────────────────────────────────────────
//

/// Where an item sits in its offline-download lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    /// Not on the device; a download may be started.
    Available,
    /// Transfer in progress, with percent completed so far.
    Downloading { percent: u8 },
    /// Fully stored on the device.
    Downloaded,
    /// The last download attempt broke off; a retry may be started.
    Failed,
}

impl DownloadState {
    #[must_use]
    pub fn is_downloaded(self) -> bool {
        matches!(self, DownloadState::Downloaded)
    }

    #[must_use]
    pub fn is_downloading(self) -> bool {
        matches!(self, DownloadState::Downloading { .. })
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadState::Available => f.write_str("available"),
            DownloadState::Downloading { percent } => write!(f, "downloading ({percent}%)"),
            DownloadState::Downloaded => f.write_str("downloaded"),
            DownloadState::Failed => f.write_str("failed"),
        }
    }
}

//
// ─── LIBRARY ITEM ──────────────────────────────────────────────────────────────
//

/// A piece of lesson content that can be stored for offline use.
///
/// The state machine is strict: every transition checks the current state and
/// rejects moves that make no sense, so a caller can never, say, remove an
/// item that was never downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryItem {
    id: String,
    title: String,
    subject: String,
    size_mb: u32,
    state: DownloadState,
}

impl LibraryItem {
    /// Creates an item in the `Available` state.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` when the id or title is blank.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        subject: impl Into<String>,
        size_mb: u32,
    ) -> Result<Self, LibraryError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(LibraryError::EmptyId);
        }
        let title = title.into();
        if title.trim().is_empty() {
            return Err(LibraryError::EmptyTitle);
        }
        Ok(Self {
            id,
            title: title.trim().to_owned(),
            subject: subject.into(),
            size_mb,
            state: DownloadState::Available,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn size_mb(&self) -> u32 {
        self.size_mb
    }

    #[must_use]
    pub fn state(&self) -> DownloadState {
        self.state
    }

    /// Starts a download, from scratch or as a retry after a failure.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::NotAvailable` unless the item is `Available`
    /// or `Failed`.
    pub fn begin_download(&mut self) -> Result<(), LibraryError> {
        match self.state {
            DownloadState::Available | DownloadState::Failed => {
                self.state = DownloadState::Downloading { percent: 0 };
                Ok(())
            }
            state => Err(LibraryError::NotAvailable { state }),
        }
    }

    /// Reports transfer progress. Progress is monotonic, and reaching 100
    /// moves the item to `Downloaded`.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` when no download is running, the percentage
    /// exceeds 100, or it is lower than the last reported value.
    pub fn advance_download(&mut self, percent: u8) -> Result<(), LibraryError> {
        let DownloadState::Downloading { percent: current } = self.state else {
            return Err(LibraryError::NotDownloading { state: self.state });
        };
        if percent > 100 {
            return Err(LibraryError::PercentOutOfRange { percent });
        }
        if percent < current {
            return Err(LibraryError::ProgressWentBackwards {
                from: current,
                to: percent,
            });
        }
        self.state = if percent == 100 {
            DownloadState::Downloaded
        } else {
            DownloadState::Downloading { percent }
        };
        Ok(())
    }

    /// Marks a running download as failed.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::NotDownloading` unless a download is running.
    pub fn fail_download(&mut self) -> Result<(), LibraryError> {
        if !self.state.is_downloading() {
            return Err(LibraryError::NotDownloading { state: self.state });
        }
        self.state = DownloadState::Failed;
        Ok(())
    }

    /// Deletes stored content, returning the item to `Available`. Also
    /// clears a failed attempt.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::NotRemovable` unless the item is `Downloaded`
    /// or `Failed`.
    pub fn remove_download(&mut self) -> Result<(), LibraryError> {
        match self.state {
            DownloadState::Downloaded | DownloadState::Failed => {
                self.state = DownloadState::Available;
                Ok(())
            }
            state => Err(LibraryError::NotRemovable { state }),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> LibraryItem {
        LibraryItem::new("forces", "Forces and Motion", "Physics", 320).unwrap()
    }

    #[test]
    fn new_items_start_available() {
        let item = item();
        assert_eq!(item.state(), DownloadState::Available);
        assert_eq!(item.size_mb(), 320);
    }

    #[test]
    fn rejects_blank_id_and_title() {
        assert_eq!(
            LibraryItem::new(" ", "T", "S", 1).unwrap_err(),
            LibraryError::EmptyId
        );
        assert_eq!(
            LibraryItem::new("id", "  ", "S", 1).unwrap_err(),
            LibraryError::EmptyTitle
        );
    }

    #[test]
    fn download_runs_to_completion() {
        let mut item = item();
        item.begin_download().unwrap();
        assert_eq!(item.state(), DownloadState::Downloading { percent: 0 });

        item.advance_download(45).unwrap();
        assert_eq!(item.state(), DownloadState::Downloading { percent: 45 });

        item.advance_download(100).unwrap();
        assert!(item.state().is_downloaded());
    }

    #[test]
    fn progress_cannot_move_backwards() {
        let mut item = item();
        item.begin_download().unwrap();
        item.advance_download(60).unwrap();

        let err = item.advance_download(30).unwrap_err();
        assert_eq!(err, LibraryError::ProgressWentBackwards { from: 60, to: 30 });
        assert_eq!(item.state(), DownloadState::Downloading { percent: 60 });
    }

    #[test]
    fn progress_over_one_hundred_is_rejected() {
        let mut item = item();
        item.begin_download().unwrap();
        let err = item.advance_download(101).unwrap_err();
        assert_eq!(err, LibraryError::PercentOutOfRange { percent: 101 });
    }

    #[test]
    fn failed_downloads_can_be_retried() {
        let mut item = item();
        item.begin_download().unwrap();
        item.advance_download(30).unwrap();
        item.fail_download().unwrap();
        assert_eq!(item.state(), DownloadState::Failed);

        item.begin_download().unwrap();
        assert_eq!(item.state(), DownloadState::Downloading { percent: 0 });
    }

    #[test]
    fn removing_a_download_frees_the_item() {
        let mut item = item();
        item.begin_download().unwrap();
        item.advance_download(100).unwrap();
        item.remove_download().unwrap();
        assert_eq!(item.state(), DownloadState::Available);
    }

    #[test]
    fn invalid_transitions_are_errors() {
        let mut item = item();

        assert!(matches!(
            item.advance_download(10),
            Err(LibraryError::NotDownloading { .. })
        ));
        assert!(matches!(
            item.fail_download(),
            Err(LibraryError::NotDownloading { .. })
        ));
        assert!(matches!(
            item.remove_download(),
            Err(LibraryError::NotRemovable { .. })
        ));

        item.begin_download().unwrap();
        assert!(matches!(
            item.begin_download(),
            Err(LibraryError::NotAvailable { .. })
        ));
    }
}
