//! Background loading of shape assets.
//!
//! A [`ShapeSource`] produces the raw JSON text asynchronously. [`PendingShapes::spawn`]
//! drives that future on a loader thread, imports the result there and hands the
//! finished [`ShapeLibrary`] back through a channel that the owner polls once per frame.

use crate::assets::{ImportError, ShapeLibrary, import_shapes_json};
use crossbeam_channel::{Receiver, TryRecvError};
use futures::executor::block_on;
use futures::future::BoxFuture;
use log::{debug, trace};
use snafu::{ResultExt, Snafu};
use std::path::PathBuf;
use std::thread::JoinHandle;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum LoadError {
    #[snafu(display("Failed to read shape asset {}: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Shape source {source_name} failed: {message}"))]
    Fetch {
        source_name: String,
        message: String,
    },

    #[snafu(display("Failed to import shapes from {source_name}: {source}"))]
    Import {
        source_name: String,
        source: ImportError,
    },

    #[snafu(display("Shape loader for {source_name} stopped without a result"))]
    Abandoned { source_name: String },
}

/// Where shape JSON comes from.
///
/// Implement this for any transport (HTTP, archives, embedded bytes). The future is
/// driven to completion on the loader thread.
pub trait ShapeSource: Send + Sync + 'static {
    /// Human readable origin, used in logs and errors.
    fn name(&self) -> String;

    fn fetch(&self) -> BoxFuture<'_, Result<String, LoadError>>;
}

/// Reads the asset from the filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

impl ShapeSource for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> BoxFuture<'_, Result<String, LoadError>> {
        Box::pin(async move {
            let json: Result<String, LoadError> =
                std::fs::read_to_string(&self.path).context(ReadErr {
                    path: self.path.clone(),
                });
            json
        })
    }
}

/// Serves JSON that is already in memory.
#[derive(Debug, Clone)]
pub struct InlineSource {
    name: String,
    json: String,
}

impl InlineSource {
    pub fn new(name: impl Into<String>, json: impl Into<String>) -> Self {
        InlineSource {
            name: name.into(),
            json: json.into(),
        }
    }
}

impl ShapeSource for InlineSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn fetch(&self) -> BoxFuture<'_, Result<String, LoadError>> {
        Box::pin(async move { Ok::<_, LoadError>(self.json.clone()) })
    }
}

/// A shape load that is in flight.
pub struct PendingShapes {
    source_name: String,
    rx: Receiver<Result<ShapeLibrary, LoadError>>,
    _thread: Option<JoinHandle<()>>,
}

impl PendingShapes {
    /// Starts loading `source` on a loader thread and returns immediately.
    pub fn spawn<S: ShapeSource>(source: S) -> Self {
        let source_name = source.name();
        let (tx, rx) = crossbeam_channel::bounded(1);

        let thread_name = source_name.clone();
        let thread = std::thread::Builder::new()
            .name("shape-loader".to_string())
            .spawn(move || {
                debug!("Loading shapes from {thread_name}");
                let result = load_blocking(&source);
                if tx.send(result).is_err() {
                    trace!("Shape load from {thread_name} finished after its owner was dropped");
                }
            });

        // A failed spawn drops the sender, which surfaces as `Abandoned` on the next poll.
        PendingShapes {
            source_name,
            rx,
            _thread: thread.ok(),
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Takes the result if the load has finished. `None` while still in flight.
    pub fn try_take(&self) -> Option<Result<ShapeLibrary, LoadError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.abandoned()),
        }
    }

    /// Blocks until the load has finished.
    pub fn wait(&self) -> Result<ShapeLibrary, LoadError> {
        self.rx.recv().unwrap_or_else(|_| self.abandoned())
    }

    fn abandoned(&self) -> Result<ShapeLibrary, LoadError> {
        AbandonedErr {
            source_name: self.source_name.clone(),
        }
        .fail()
    }
}

/// Fetches and imports synchronously on the calling thread.
pub fn load_blocking<S: ShapeSource + ?Sized>(source: &S) -> Result<ShapeLibrary, LoadError> {
    let json = block_on(source.fetch())?;
    let library = import_shapes_json(&json).context(ImportErr {
        source_name: source.name(),
    })?;
    debug!(
        "Imported {} shapes from {}",
        library.len(),
        source.name()
    );
    Ok(library)
}
