use conceptmap_core::{GraphError, GraphMetrics, NodeId, Point};
use conceptmap_events::{Event, EventBus, publish};
use conceptmap_export::{ExportError, ExportOutcome, ImageQueue, image_already_logged};
use conceptmap_graph::{GraphModel, HitTester};
use crossbeam_channel::{Receiver, Sender};
use image::RgbaImage;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// What a canvas click did to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClickOutcome {
    NodeAdded(NodeId),
    /// `added` is false when the pair was already connected.
    EdgeAdded { from: NodeId, to: NodeId, added: bool },
    CrosslinkAdded { from: NodeId, to: NodeId, added: bool },
    Selected(NodeId),
    Deselected(NodeId),
    Ignored,
}

#[derive(Debug, Clone)]
pub struct DoneOutcome {
    pub export: ExportOutcome,
    /// The image the session moved on to, if any remain.
    pub next_image: Option<PathBuf>,
}

/// GUI-agnostic annotation session: one graph model, the click rules that
/// drive it, and the export-then-advance flow.
///
/// Any shell (CLI, desktop) calls these methods. Events are only queued
/// once a host subscribes through `events()`.
pub struct Session {
    model: GraphModel,
    hit_tester: HitTester,
    events: Option<Sender<Event>>,
}

/// A session shared between actors; the mutex serializes every mutation.
pub type SharedSession = Arc<Mutex<Session>>;

impl Default for Session {
    fn default() -> Self {
        Self::new(HitTester::new())
    }
}

impl Session {
    pub fn new(hit_tester: HitTester) -> Self {
        Self {
            model: GraphModel::new(),
            hit_tester,
            events: None,
        }
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    /// Subscribe to model and session events from now on.
    ///
    /// The returned receiver is the only one; a later call replaces it, and
    /// dropping it stops events from queueing.
    pub fn events(&mut self) -> Receiver<Event> {
        let bus = EventBus::new();
        self.model.set_events(Some(bus.sender()));
        self.events = Some(bus.sender());
        bus.receiver()
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.events {
            publish(tx, event);
        }
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn metrics(&self) -> GraphMetrics {
        self.model.metrics()
    }

    pub fn hit_tester(&self) -> &HitTester {
        &self.hit_tester
    }

    /// Start annotating `image`; any graph in progress is discarded.
    pub fn open_image(&mut self, image: PathBuf) {
        tracing::info!("Opened image {}", image.display());
        self.model.set_image_path(Some(image));
        self.model.reset_graph();
    }

    pub fn set_output(&mut self, output: PathBuf) {
        self.model.set_output_path(Some(output));
    }

    pub fn set_prior_knowledge(&mut self, value: Option<i64>) {
        self.model.set_prior_knowledge(value);
    }

    pub fn set_questions(&mut self, value: Option<i64>) {
        self.model.set_questions(value);
    }

    pub fn can_complete(&self) -> bool {
        self.model.is_completable()
    }

    /// Primary click on the canvas.
    ///
    /// Clicking another node while one is selected connects them and moves
    /// the selection; clicking a node otherwise toggles its selection;
    /// clicking empty canvas adds a node when it has somewhere to attach.
    pub fn click(&mut self, pos: Point) -> Result<ClickOutcome, SessionError> {
        let selected = self.hit_tester.hit_test(&self.model, pos);
        let current = self.model.current();

        let outcome = match (selected, current) {
            (Some(selected), Some(current)) if selected != current => {
                tracing::debug!("Adding edge from {} to {}", selected, current);
                let added = self.model.add_edge(selected, current)?;
                self.model.set_current(Some(selected))?;
                ClickOutcome::EdgeAdded {
                    from: current,
                    to: selected,
                    added,
                }
            }
            (Some(selected), Some(_)) => {
                self.model.set_current(None)?;
                ClickOutcome::Deselected(selected)
            }
            (Some(selected), None) => {
                self.model.set_current(Some(selected))?;
                ClickOutcome::Selected(selected)
            }
            (None, Some(_)) => ClickOutcome::NodeAdded(self.model.add_node(pos)?),
            (None, None) if self.model.root().is_none() => {
                ClickOutcome::NodeAdded(self.model.add_node(pos)?)
            }
            (None, None) => ClickOutcome::Ignored,
        };

        for node in self.model.nodes() {
            tracing::trace!("{}", node);
        }
        Ok(outcome)
    }

    /// Secondary click: crosslink the selected node to the node under `pos`.
    pub fn crosslink_click(&mut self, pos: Point) -> Result<ClickOutcome, SessionError> {
        let selected = self.hit_tester.hit_test(&self.model, pos);
        match (selected, self.model.current()) {
            (Some(selected), Some(current)) if selected != current => {
                let added = self.model.add_crosslink(current, selected)?;
                Ok(ClickOutcome::CrosslinkAdded {
                    from: current,
                    to: selected,
                    added,
                })
            }
            _ => Ok(ClickOutcome::Ignored),
        }
    }

    pub fn reset_current(&mut self) -> Result<(), SessionError> {
        self.model.set_current(None)?;
        Ok(())
    }

    pub fn delete_current(&mut self) -> Result<Option<NodeId>, SessionError> {
        Ok(self.model.delete_current_node()?)
    }

    pub fn reset_graph(&mut self) {
        self.model.reset_graph();
    }

    /// Whether the open image already has a row in the output log.
    pub fn already_logged(&self) -> Result<bool, SessionError> {
        let (Some(image), Some(output)) = (self.model.image_path(), self.model.output_path())
        else {
            return Ok(false);
        };
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(image_already_logged(output, &name)?)
    }

    /// Log the current graph, then move on to the next unprocessed image in
    /// the same folder with a fresh graph.
    ///
    /// The next image is chosen before anything is written, so a failure
    /// leaves both the log and the graph as they were.
    pub fn done(&mut self, snapshot: Option<&RgbaImage>) -> Result<DoneOutcome, SessionError> {
        let Some(image) = self.model.image_path().filter(|_| self.model.is_completable()) else {
            return Err(ExportError::NotReady.into());
        };
        let image = image.to_path_buf();
        let name = image.file_name().map(|n| n.to_string_lossy().into_owned());

        // A bare file name has an empty parent, which the queue reads as
        // the working directory.
        let folder = image.parent().unwrap_or(Path::new(""));
        let next_image = ImageQueue::new(folder)
            .next_unprocessed_after(self.model.output_path(), name.as_deref())?;

        let export = conceptmap_export::export(&self.model, snapshot)?;
        self.emit(Event::ImageExported {
            image,
            log: export.log.clone(),
            snapshot: export.snapshot.clone(),
        });

        self.model.set_image_path(next_image.clone());
        self.model.reset_graph();
        self.emit(Event::ImageAdvanced {
            next: next_image.clone(),
        });

        Ok(DoneOutcome { export, next_image })
    }
}
