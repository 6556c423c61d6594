//! Change notifier integration.
//!
//! `notify` events are translated into [`FsEvent`]s and routed by [`EventRouter`] on the
//! notifier's own thread: writes and arrivals go to the work queue, deletions go to the
//! daemon loop over a channel, and a directory arriving by rename has its `.mp3` files
//! queued one by one.

use crate::error::Error;
use crate::queue::WorkQueue;
use crate::scanner::{mp3_files, PathFilter};
use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    ClosedWrite,
    Deleted,
    MovedIn,
    MovedOut,
    /// A directory that arrived under a new name, with its whole subtree.
    SelfMoved,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub is_dir: bool,
    pub kind: FsEventKind,
}

impl FsEvent {
    pub fn new(kind: FsEventKind, path: impl Into<PathBuf>, is_dir: bool) -> Self {
        Self {
            path: path.into(),
            is_dir,
            kind,
        }
    }
}

/// Translate one `notify` event into zero or more engine events.
pub fn translate(event: &Event) -> Vec<FsEvent> {
    let paths = &event.paths;
    match &event.kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => paths
            .iter()
            .map(|p| FsEvent::new(FsEventKind::ClosedWrite, p, false))
            .collect(),
        EventKind::Create(kind) => paths
            .iter()
            .map(|p| {
                let is_dir = matches!(kind, CreateKind::Folder) || p.is_dir();
                FsEvent::new(FsEventKind::Created, p, is_dir)
            })
            .collect(),
        EventKind::Remove(kind) => paths
            .iter()
            .map(|p| FsEvent::new(FsEventKind::Deleted, p, matches!(kind, RemoveKind::Folder)))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => paths
            .iter()
            .map(|p| FsEvent::new(FsEventKind::MovedOut, p, false))
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.iter().map(|p| arrival(p)).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() == 2 => vec![
            FsEvent::new(FsEventKind::MovedOut, &paths[0], false),
            arrival(&paths[1]),
        ],
        // Backends that cannot tell the direction of a rename.
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .iter()
            .map(|p| {
                if p.exists() {
                    arrival(p)
                } else {
                    FsEvent::new(FsEventKind::MovedOut, p, false)
                }
            })
            .collect(),
        _ => paths
            .iter()
            .map(|p| FsEvent::new(FsEventKind::Other, p, p.is_dir()))
            .collect(),
    }
}

fn arrival(path: &Path) -> FsEvent {
    if path.is_dir() {
        FsEvent::new(FsEventKind::SelfMoved, path, true)
    } else {
        FsEvent::new(FsEventKind::MovedIn, path, false)
    }
}

/// What the router did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Number of paths newly added to the queue.
    Enqueued(usize),
    DeletionScheduled,
    Ignored,
}

/// Applies the per-event policy. Cheap to clone; one copy lives in the notifier callback.
#[derive(Clone)]
pub struct EventRouter {
    queue: Arc<WorkQueue>,
    deletions: Sender<PathBuf>,
    filter: PathFilter,
}

impl EventRouter {
    pub fn new(queue: Arc<WorkQueue>, deletions: Sender<PathBuf>, filter: PathFilter) -> Self {
        Self {
            queue,
            deletions,
            filter,
        }
    }

    pub fn route(&self, event: FsEvent) -> Routed {
        match event.kind {
            FsEventKind::ClosedWrite | FsEventKind::MovedIn
                if !event.is_dir && self.filter.accepts(&event.path) =>
            {
                debug!("{:?}: queueing {}", event.kind, event.path.display());
                Routed::Enqueued(usize::from(self.queue.push(event.path)))
            }
            FsEventKind::Deleted if !event.is_dir && self.filter.accepts(&event.path) => {
                debug!("Deleted: {}", event.path.display());
                match self.deletions.send(event.path) {
                    Ok(()) => Routed::DeletionScheduled,
                    Err(e) => {
                        error!("Deletion channel closed, dropping {}", e.0.display());
                        Routed::Ignored
                    }
                }
            }
            FsEventKind::SelfMoved => {
                let mut added = 0;
                for file in mp3_files(&event.path, &self.filter) {
                    if self.queue.push(file) {
                        added += 1;
                    }
                }
                info!(
                    "Directory {} moved in, queued {} file(s)",
                    event.path.display(),
                    added
                );
                Routed::Enqueued(added)
            }
            _ => {
                debug!("Ignoring {:?} on {}", event.kind, event.path.display());
                Routed::Ignored
            }
        }
    }
}

/// A running recursive watch on the music root. Dropping it stops delivery.
pub struct ChangeNotifier {
    watcher: RecommendedWatcher,
    root: PathBuf,
}

impl ChangeNotifier {
    pub fn start(root: &Path, router: EventRouter) -> Result<Self, Error> {
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for fs_event in translate(&event) {
                        router.route(fs_event);
                    }
                }
                Err(e) => error!("Watch error: {}", e),
            },
            Config::default(),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        info!("Watching {}", root.display());

        Ok(Self {
            watcher,
            root: root.to_path_buf(),
        })
    }

    pub fn stop(mut self) {
        if let Err(e) = self.watcher.unwatch(&self.root) {
            debug!("Unwatch of {} failed: {}", self.root.display(), e);
        }
        info!("Stopped watching {}", self.root.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::mpsc;
    use tempfile::tempdir;

    fn router() -> (EventRouter, Arc<WorkQueue>, mpsc::Receiver<PathBuf>) {
        let queue = Arc::new(WorkQueue::new());
        let (tx, rx) = mpsc::channel();
        (
            EventRouter::new(Arc::clone(&queue), tx, PathFilter::default()),
            queue,
            rx,
        )
    }

    #[test]
    fn test_translate_close_write() {
        let event = Event::new(EventKind::Access(AccessKind::Close(AccessMode::Write)))
            .add_path(PathBuf::from("/m/a.mp3"));
        assert_eq!(
            translate(&event),
            vec![FsEvent::new(FsEventKind::ClosedWrite, "/m/a.mp3", false)]
        );
    }

    #[test]
    fn test_translate_rename_both_splits() {
        let dir = tempdir().unwrap();
        let new_path = dir.path().join("b.mp3");
        fs::write(&new_path, b"x").unwrap();

        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(dir.path().join("a.mp3"))
            .add_path(new_path.clone());
        let translated = translate(&event);

        assert_eq!(translated.len(), 2);
        assert_eq!(translated[0].kind, FsEventKind::MovedOut);
        assert_eq!(translated[1], FsEvent::new(FsEventKind::MovedIn, new_path, false));
    }

    #[test]
    fn test_translate_directory_arrival_is_self_moved() {
        let dir = tempdir().unwrap();
        let album = dir.path().join("album");
        fs::create_dir(&album).unwrap();

        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path(album.clone());
        assert_eq!(
            translate(&event),
            vec![FsEvent::new(FsEventKind::SelfMoved, album, true)]
        );
    }

    #[test]
    fn test_translate_remove_folder() {
        let event = Event::new(EventKind::Remove(RemoveKind::Folder))
            .add_path(PathBuf::from("/m/gone"));
        assert_eq!(
            translate(&event),
            vec![FsEvent::new(FsEventKind::Deleted, "/m/gone", true)]
        );
    }

    #[test]
    fn test_route_write_and_move_in_enqueue_once() {
        let (router, queue, _rx) = router();
        assert_eq!(
            router.route(FsEvent::new(FsEventKind::ClosedWrite, "/m/a.mp3", false)),
            Routed::Enqueued(1)
        );
        assert_eq!(
            router.route(FsEvent::new(FsEventKind::MovedIn, "/m/a.mp3", false)),
            Routed::Enqueued(0)
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_route_ignores_non_mp3_and_other_kinds() {
        let (router, queue, rx) = router();
        assert_eq!(
            router.route(FsEvent::new(FsEventKind::ClosedWrite, "/m/cover.jpg", false)),
            Routed::Ignored
        );
        assert_eq!(
            router.route(FsEvent::new(FsEventKind::Created, "/m/a.mp3", false)),
            Routed::Ignored
        );
        assert_eq!(
            router.route(FsEvent::new(FsEventKind::MovedOut, "/m/a.mp3", false)),
            Routed::Ignored
        );
        assert!(queue.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_route_delete_goes_to_channel_not_queue() {
        let (router, queue, rx) = router();
        assert_eq!(
            router.route(FsEvent::new(FsEventKind::Deleted, "/m/a.mp3", false)),
            Routed::DeletionScheduled
        );
        assert!(queue.is_empty());
        assert_eq!(rx.try_recv().unwrap(), PathBuf::from("/m/a.mp3"));
    }

    #[test]
    fn test_route_self_moved_enqueues_each_file() {
        let dir = tempdir().unwrap();
        let album = dir.path().join("album");
        fs::create_dir_all(album.join("cd2")).unwrap();
        fs::write(album.join("01.mp3"), b"x").unwrap();
        fs::write(album.join("cd2/02.mp3"), b"x").unwrap();
        fs::write(album.join("folder.jpg"), b"x").unwrap();

        let (router, queue, _rx) = router();
        assert_eq!(
            router.route(FsEvent::new(FsEventKind::SelfMoved, album.clone(), true)),
            Routed::Enqueued(2)
        );
        assert!(queue.contains(&album.join("01.mp3")));
        assert!(queue.contains(&album.join("cd2/02.mp3")));
        assert!(!queue.contains(&album));
    }

    #[test]
    fn test_notifier_queues_written_file() {
        let dir = tempdir().unwrap();
        let (router, queue, _rx) = router();
        let notifier = ChangeNotifier::start(dir.path(), router).unwrap();

        let song = dir.path().join("fresh.mp3");
        fs::write(&song, b"audio").unwrap();

        let mut queued = false;
        for _ in 0..50 {
            if queue.contains(&song) {
                queued = true;
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
        notifier.stop();

        assert!(queued);
        assert_eq!(queue.len(), 1);
    }
}
