//! Hot-reload watcher
//!
//! We watch **directories** (not individual files) because editors often save by writing a
//! temp file and renaming it over the original. Directory watching catches that reliably.
//!
//! The watcher only sends lightweight signals; shader compiles and vars loads stay on the
//! render thread.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use shadevars_engine::logw;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotEvent {
    /// The vertex or fragment shader was saved.
    ShaderChanged(PathBuf),
    /// The vars file was rewritten outside the viewer.
    VarsChanged(PathBuf),
}

pub struct HotReload {
    _watcher: RecommendedWatcher,
    rx: Receiver<HotEvent>,
}

/// Files the viewer reacts to.
#[derive(Debug, Clone)]
pub struct WatchSet {
    pub shaders: Vec<PathBuf>,
    pub vars: PathBuf,
}

impl WatchSet {
    pub fn classify(&self, p: &Path) -> Option<HotEvent> {
        let name = p.file_name()?;
        if self.shaders.iter().any(|s| s.file_name() == Some(name)) {
            Some(HotEvent::ShaderChanged(p.to_path_buf()))
        } else if self.vars.file_name() == Some(name) {
            Some(HotEvent::VarsChanged(p.to_path_buf()))
        } else {
            None
        }
    }
}

impl HotReload {
    pub fn rx(&self) -> &Receiver<HotEvent> {
        &self.rx
    }

    pub fn new(set: WatchSet) -> anyhow::Result<Self> {
        let (tx, rx) = unbounded::<HotEvent>();
        let dirs: Vec<PathBuf> = set
            .shaders
            .iter()
            .chain(std::iter::once(&set.vars))
            .map(|f| parent_dir(f))
            .collect();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(ev) => {
                    if !matches!(ev.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        return;
                    }
                    for p in &ev.paths {
                        if let Some(hot) = set.classify(p) {
                            let _ = tx.send(hot);
                        }
                    }
                }
                Err(e) => logw!("WATCH", "notify error: {e}"),
            },
            // notify 6 doesn't debounce; polling less often keeps backends that poll quiet
            Config::default().with_poll_interval(Duration::from_millis(250)),
        )?;

        let mut watched: Vec<&PathBuf> = Vec::new();
        for d in &dirs {
            if watched.contains(&d) {
                continue;
            }
            watcher.watch(d, RecursiveMode::NonRecursive)?;
            watched.push(d);
        }

        Ok(Self { _watcher: watcher, rx })
    }
}

fn parent_dir(file: &Path) -> PathBuf {
    file.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> WatchSet {
        WatchSet {
            shaders: vec!["/a/shaders/default.vert".into(), "/a/shaders/default.frag".into()],
            vars: "/a/default.vars".into(),
        }
    }

    #[test]
    fn classifies_by_file_name() {
        let s = set();
        assert_eq!(
            s.classify(Path::new("/a/shaders/default.frag")),
            Some(HotEvent::ShaderChanged("/a/shaders/default.frag".into()))
        );
        assert_eq!(
            s.classify(Path::new("/a/default.vars")),
            Some(HotEvent::VarsChanged("/a/default.vars".into()))
        );
        assert_eq!(s.classify(Path::new("/a/default.vars.tmp")), None);
    }

    #[test]
    fn bare_file_names_watch_the_current_dir() {
        assert_eq!(parent_dir(Path::new("x.frag")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("/a/b/x.frag")), PathBuf::from("/a/b"));
    }
}
