// autosave.rs — Decide whether the host's background auto-save may run.
//
// While the overlay's own modal operator runs, the host's built-in auto-save
// timer never fires, so the add-on saves on the host's behalf. That save
// must not run while some other modal operator (a transform, a fly
// navigation, ...) owns a window: `should_block_save` checks for that, and
// `AutoSaveTimer` keeps the interval bookkeeping.
//
// The file itself is written by the host; nothing here touches disk.

use crate::inspector::{self, HandlerKind};
use crate::layout::LayoutSet;
use crate::memory::Address;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Why a save may or may not go ahead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveDecision {
    Allow,
    /// Another modal operator is running in some window.
    Block { idname: String },
}

impl SaveDecision {
    pub fn is_block(&self) -> bool {
        matches!(self, SaveDecision::Block { .. })
    }
}

/// Inspect every window's modal handlers and report the first operator
/// handler that is not ours.
///
/// # Safety
/// Every address in `windows` must be a live host window.
pub unsafe fn save_decision(set: &'static LayoutSet, windows: &[Address], own_idname: &str) -> SaveDecision {
    for &window in windows {
        let foreign = inspector::inspect(set, window)
            .filter(|r| r.kind == HandlerKind::Operator)
            .find_map(|r| r.operator_idname.filter(|id| id != own_idname));
        if let Some(idname) = foreign {
            debug!(window = %window, idname = %idname, "modal operator running, skipping auto save");
            return SaveDecision::Block { idname };
        }
    }
    SaveDecision::Allow
}

/// `true` when a modal operator other than ours is running in any window.
///
/// # Safety
/// Every address in `windows` must be a live host window.
pub unsafe fn should_block_save(set: &'static LayoutSet, windows: &[Address], own_idname: &str) -> bool {
    save_decision(set, windows, own_idname).is_block()
}

// ============================================================
// Interval bookkeeping
// ============================================================

/// Tracks when the last auto-save happened and whether one is in flight.
#[derive(Debug)]
pub struct AutoSaveTimer {
    interval: Duration,
    last_saved: Option<SystemTime>,
    saving: bool,
}

impl AutoSaveTimer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_saved: None, saving: false }
    }

    /// The host lets users change the interval (in minutes) at any time.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn last_saved(&self) -> Option<SystemTime> {
        self.last_saved
    }

    /// Whether the interval has elapsed at `now`.
    pub fn is_due(&self, now: SystemTime) -> bool {
        match self.last_saved {
            None => true,
            // A clock that went backwards counts as "not yet".
            Some(last) => now.duration_since(last).map_or(false, |elapsed| elapsed >= self.interval),
        }
    }

    /// The save file may have been written by something else (the host's own
    /// timer, a manual save). Count its modification time as our last save.
    pub fn observe_existing(&mut self, mtime: SystemTime) {
        if self.last_saved.map_or(true, |last| last < mtime) {
            debug!(?mtime, "auto save file updated elsewhere");
            self.last_saved = Some(mtime);
        }
    }

    /// Claim the save slot. `false` if a save is already running or the
    /// interval has not elapsed.
    pub fn begin(&mut self, now: SystemTime) -> bool {
        if self.saving || !self.is_due(now) {
            return false;
        }
        self.saving = true;
        true
    }

    /// Release the save slot; `saved_at` is the new file's modification time,
    /// or `None` if the save failed.
    pub fn finish(&mut self, saved_at: Option<SystemTime>) {
        if let Some(t) = saved_at {
            self.last_saved = Some(t);
        }
        self.saving = false;
    }
}

/// File name for the auto-save copy: the blend file's own stem when it has
/// been saved, the process id otherwise.
pub fn autosave_basename(blend_path: Option<&Path>, pid: u32) -> String {
    match blend_path.and_then(|p| p.file_stem()).and_then(|s| s.to_str()) {
        Some(stem) if !stem.is_empty() => format!("{stem}.blend"),
        _ => format!("{pid}.blend"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{v2_79, v3_4};
    use crate::sim::{window_with, Fake, HostArena};

    const MINE: &str = "wm.sk_screencast_keys";
    const MINE_C: &str = "WM_OT_sk_screencast_keys";

    #[test]
    fn only_our_operator_allows_save() {
        for set in [&v3_4::LAYOUT, &v2_79::LAYOUT] {
            let mut host = HostArena::new(set);
            let (win, _) = window_with(&mut host, &[Fake::Op(MINE_C), Fake::Keymap, Fake::Op(MINE_C)]);
            assert!(!unsafe { should_block_save(set, &[win], MINE) });
        }
    }

    #[test]
    fn no_operator_handlers_allow_save() {
        let mut host = HostArena::new(&v3_4::LAYOUT);
        let (win, _) = window_with(&mut host, &[Fake::Keymap, Fake::Ui, Fake::OpNull]);
        let (empty, _) = window_with(&mut host, &[]);
        assert!(!unsafe { should_block_save(&v3_4::LAYOUT, &[win, empty], MINE) });
        assert!(!unsafe { should_block_save(&v3_4::LAYOUT, &[], MINE) });
    }

    #[test]
    fn foreign_operator_in_any_window_blocks() {
        let mut host = HostArena::new(&v3_4::LAYOUT);
        let (quiet, _) = window_with(&mut host, &[Fake::Op(MINE_C)]);
        let (busy, _) = window_with(&mut host, &[Fake::Op(MINE_C), Fake::Op("TRANSFORM_OT_translate")]);

        assert_eq!(
            unsafe { save_decision(&v3_4::LAYOUT, &[quiet, busy], MINE) },
            SaveDecision::Block { idname: "transform.translate".to_string() }
        );
        assert!(unsafe { should_block_save(&v3_4::LAYOUT, &[busy], MINE) });
    }

    #[test]
    fn timer_waits_for_interval() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let mut timer = AutoSaveTimer::new(Duration::from_secs(120));
        assert!(timer.is_due(t0));

        assert!(timer.begin(t0));
        assert!(!timer.begin(t0), "second save while the first runs");
        timer.finish(Some(t0));

        assert!(!timer.is_due(t0 + Duration::from_secs(119)));
        assert!(timer.is_due(t0 + Duration::from_secs(120)));
        assert!(!timer.is_due(t0 - Duration::from_secs(5)));
    }

    #[test]
    fn failed_save_keeps_previous_time() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let mut timer = AutoSaveTimer::new(Duration::from_secs(60));
        timer.observe_existing(t0);
        let later = t0 + Duration::from_secs(61);
        assert!(timer.begin(later));
        timer.finish(None);
        assert_eq!(timer.last_saved(), Some(t0));
        assert!(timer.begin(later));
    }

    #[test]
    fn newer_file_on_disk_pushes_the_next_save_back() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let mut timer = AutoSaveTimer::new(Duration::from_secs(60));
        timer.finish(Some(t0));
        timer.observe_existing(t0 + Duration::from_secs(50));
        assert!(!timer.is_due(t0 + Duration::from_secs(70)));

        timer.observe_existing(t0);
        assert_eq!(timer.last_saved(), Some(t0 + Duration::from_secs(50)));
    }

    #[test]
    fn basename_from_blend_or_pid() {
        assert_eq!(autosave_basename(Some(Path::new("/work/shot_010.blend")), 42), "shot_010.blend");
        assert_eq!(autosave_basename(None, 4242), "4242.blend");
        assert_eq!(autosave_basename(Some(Path::new("")), 7), "7.blend");
    }
}
