//! Session management
//!
//! A session is one run of an executable. It owns a timestamped directory under the sessions
//! directory which holds the log file, the csv archives (under `arch/`) and any json documents
//! saved during the run. Saves are written by a background thread so the control loop never
//! blocks on the filesystem.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use erased_serde::Serialize;
use log::{info, warn};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Format of the timestamp appended to session directory names.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Name of the archive directory inside a session.
const ARCH_DIR: &str = "arch";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A struct storing information about the current session
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The root directory for this session's archives
    pub arch_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,

    save_sender: Sender<SaveMsg>,

    save_thread: Option<JoinHandle<()>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot locate the sessions directory: {0}")]
    SwRootError(crate::host::HostError),

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error("A session has already been started in this process")]
    AlreadyStarted,
}

/// Errors raised by the save thread. These are logged rather than returned since the caller has
/// already moved on.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Unsupported file extension {0:?}, only json documents can be saved")]
    UnsupportedExtension(Option<String>),

    #[error("Cannot create the parent directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error("Cannot open the file: {0}")]
    CannotOpen(std::io::Error),

    #[error("Cannot serialize the document: {0}")]
    SerializeError(serde_json::Error),
}

enum SaveMsg {
    Save(PathBuf, Box<dyn Serialize + Send>),
    Stop,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory (relative to the software root).
    ///
    /// This creates the session directory `{exec_name}_{timestamp}` and its archive directory,
    /// and sets the epoch used by [`get_elapsed_seconds`]. Only one session may be started per
    /// process.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(|_| SessionError::AlreadyStarted)?;
        let epoch = SESSION_EPOCH.get().ok_or(SessionError::AlreadyStarted)?;

        let root = crate::host::get_sw_root().map_err(SessionError::SwRootError)?;
        let session_root = root
            .join(sessions_dir)
            .join(session_dir_name(exec_name, epoch));

        let arch_root = session_root.join(ARCH_DIR);
        fs::create_dir_all(&arch_root).map_err(SessionError::CannotCreateDir)?;

        let log_file_path = session_root.join(format!("{}.log", exec_name));

        let (save_sender, rx) = channel();
        let thread_root = session_root.clone();
        let save_thread = thread::spawn(move || save_thread(thread_root, rx));

        Ok(Session {
            session_root,
            arch_root,
            log_file_path,
            save_sender,
            save_thread: Some(save_thread),
        })
    }

    /// Saves the given data to the given session-relative path in a background thread.
    pub fn save<P: AsRef<Path>, T: Serialize + Send + 'static>(&self, path: P, data: T) {
        let msg = SaveMsg::Save(path.as_ref().to_path_buf(), Box::new(data));
        if self.save_sender.send(msg).is_err() {
            warn!("Save thread has stopped, {:?} will not be written", path.as_ref());
        }
    }

    /// Exit the session, waiting for the save thread to write everything queued before this call.
    pub fn exit(mut self) {
        info!("Stopping save thread");

        // Stop is queued behind any pending saves so they are all written first
        self.save_sender.send(SaveMsg::Stop).ok();

        if let Some(handle) = self.save_thread.take() {
            if handle.join().is_err() {
                warn!("Save thread panicked");
            }
        }

        info!("Save thread exited");
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the start of the session.
///
/// Returns zero if no session has been started, so that logging set up in tests still works.
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.get() {
        Some(e) => time::duration_to_seconds(Utc::now() - *e).unwrap_or(std::f64::NAN),
        None => 0.0,
    }
}

/// Return the session's epoch, if a session has been started.
pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get()
}

/// Name of the directory for a session of `exec_name` starting at `epoch`.
pub fn session_dir_name(exec_name: &str, epoch: &DateTime<Utc>) -> String {
    format!("{}_{}", exec_name, epoch.format(TIMESTAMP_FORMAT))
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn save_thread(session_root: PathBuf, receiver: Receiver<SaveMsg>) {
    // Ends on an explicit stop or when the session is dropped without exiting
    while let Ok(msg) = receiver.recv() {
        match msg {
            SaveMsg::Save(path, data) => {
                let full_path = session_root.join(&path);
                if let Err(e) = write_document(&full_path, &*data) {
                    warn!("Couldn't save {:?}: {}", full_path, e);
                }
            }
            SaveMsg::Stop => break,
        }
    }
}

/// Write a single document to `path`, choosing the format from the extension.
fn write_document(path: &Path, data: &dyn Serialize) -> Result<(), SaveError> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => (),
        ext => return Err(SaveError::UnsupportedExtension(ext.map(String::from))),
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(SaveError::CannotCreateDir)?;
    }

    let file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(path)
        .map_err(SaveError::CannotOpen)?;

    serde_json::to_writer_pretty(&file, data).map_err(SaveError::SerializeError)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
