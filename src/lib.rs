// lib.rs — C entry points of the screencast keys core library.
//
// The add-on loads this library with ctypes once it is enabled, calls
// `sk_core_init` with the running host's version and its preferences, and
// from then on hands raw window addresses to the other `sk_*` functions from
// inside its own modal callbacks:
//   1. sk_sort_modal_handlers  -> bring our modal handlers to the front
//   2. sk_autosave_try_begin   -> may the background save run right now?
//   3. sk_log_modal_handlers   -> dump a window's handler list (debug aid)
//
// Every call runs on the host's main thread and finishes before it returns.
// No entry point may unwind into the host.

// Every registered layout is LP64.
#[cfg(not(target_pointer_width = "64"))]
compile_error!("screencast_keys_core only supports 64-bit hosts.");

pub mod autosave; // Auto-save gate and interval bookkeeping
pub mod config;   // Settings passed over by the add-on
pub mod error;    // LayoutError / ConfigError
pub mod inspector; // Read-only view of a window's modal handlers
pub mod layout;   // Per-version struct layouts of the host
pub mod listbase; // Intrusive doubly-linked list operations
pub mod logging;  // tracing subscriber setup
pub mod memory;   // Address + typed view over host memory
pub mod reorder;  // Move our handlers to the front
pub mod version;  // Host version parsing and ranges

#[cfg(test)]
mod sim; // Synthetic host memory for tests

use autosave::AutoSaveTimer;
use config::Config;
use error::LayoutError;
use layout::LayoutSet;
use memory::Address;
use once_cell::sync::{Lazy, OnceCell};
use reorder::ReorderOutcome;
use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};
use version::HostVersion;

// ============================================================
// Return codes
// ============================================================

pub const SK_OK: i32 = 0;
pub const SK_ERR_UNSUPPORTED_VERSION: i32 = -1;
pub const SK_ERR_CONFIG: i32 = -2;
pub const SK_ERR_LAYOUT: i32 = -3;
pub const SK_ERR_NOT_INITIALIZED: i32 = -4;
pub const SK_ERR_PANIC: i32 = -5;

/// `sk_sort_modal_handlers` results.
pub const SK_SORT_UNCHANGED: i32 = 0;
pub const SK_SORT_REORDERED: i32 = 1;
pub const SK_SORT_ABORTED_UI: i32 = 2;
pub const SK_SORT_DISABLED: i32 = 3;

// ============================================================
// Global state
// ============================================================

/// What the first successful init resolved. Fixed for the life of the
/// process; the host version cannot change under a loaded library.
#[derive(Debug)]
pub struct Core {
    pub version: HostVersion,
    pub layouts: &'static LayoutSet,
    pub own_idname: String,
}

static CORE: OnceCell<Core> = OnceCell::new();

/// Preference toggles. These follow every init and `sk_core_set_features`.
static GET_EVENT_AGGRESSIVELY: AtomicBool = AtomicBool::new(false);
static AUTO_SAVE: AtomicBool = AtomicBool::new(false);

/// The host may run the auto-save hook from more than one thread; the timer's
/// in-progress flag is what keeps two saves from overlapping.
static AUTO_SAVE_TIMER: Lazy<Mutex<AutoSaveTimer>> =
    Lazy::new(|| Mutex::new(AutoSaveTimer::new(Duration::from_secs(120))));

fn timer() -> MutexGuard<'static, AutoSaveTimer> {
    AUTO_SAVE_TIMER.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Select and validate the layouts for `version`.
pub fn resolve_core(version: HostVersion, config: &Config) -> Result<Core, LayoutError> {
    let layouts = layout::resolve(version)?;
    Ok(Core { version, layouts, own_idname: config.own_idname.clone() })
}

fn core() -> Option<&'static Core> {
    CORE.get()
}

fn error_code(e: &LayoutError) -> i32 {
    match e {
        LayoutError::UnsupportedVersion(_) => SK_ERR_UNSUPPORTED_VERSION,
        _ => SK_ERR_LAYOUT,
    }
}

/// Run `f`, turning a panic into `fallback` instead of unwinding into the host.
fn guarded<T>(fallback: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(v) => v,
        Err(_) => {
            error!("panic caught at the library boundary");
            fallback
        }
    }
}

/// Host time values arrive as float seconds since the epoch; negative means
/// "no such file".
fn epoch_secs(secs: f64) -> Option<SystemTime> {
    (secs.is_finite() && secs >= 0.0).then(|| SystemTime::UNIX_EPOCH + Duration::from_secs_f64(secs))
}

unsafe fn window_slice(windows: *const *mut c_void, count: usize) -> Vec<Address> {
    if windows.is_null() || count == 0 {
        return Vec::new();
    }
    std::slice::from_raw_parts(windows, count).iter().map(|&w| Address::from(w)).collect()
}

fn disable_features() {
    GET_EVENT_AGGRESSIVELY.store(false, Ordering::Release);
    AUTO_SAVE.store(false, Ordering::Release);
}

// ============================================================
// Exported entry points
// ============================================================

/// Parse the config, start logging and resolve the layouts for the running
/// host. A failure leaves both features switched off.
///
/// # Safety
/// `config_json` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn sk_core_init(major: u16, minor: u16, patch: u16, config_json: *const c_char) -> i32 {
    guarded(SK_ERR_PANIC, || {
        let config = match Config::from_c_str(config_json) {
            Ok(c) => c,
            Err(e) => {
                logging::init(&Config::default());
                disable_features();
                error!(error = %e, "rejecting add-on config; aggressive capture and auto save disabled");
                return SK_ERR_CONFIG;
            }
        };
        logging::init(&config);

        let version = HostVersion::new(major, minor, patch);
        if let Some(existing) = core() {
            if existing.version != version {
                warn!(loaded = %existing.version, requested = %version, "core already initialized for another host version");
            }
        } else {
            match resolve_core(version, &config) {
                Ok(c) => {
                    info!(host = %version, layouts = c.layouts.name, "core initialized");
                    let _ = CORE.set(c);
                }
                Err(e) => {
                    disable_features();
                    warn!(host = %version, error = %e, "aggressive capture and auto save disabled");
                    return error_code(&e);
                }
            }
        }

        GET_EVENT_AGGRESSIVELY.store(config.get_event_aggressively, Ordering::Release);
        AUTO_SAVE.store(config.auto_save, Ordering::Release);
        SK_OK
    })
}

/// 1 when layouts are loaded for the running host, 0 otherwise.
#[no_mangle]
pub extern "C" fn sk_core_is_supported() -> i32 {
    core().is_some() as i32
}

/// Update the preference toggles after the user changes them.
#[no_mangle]
pub extern "C" fn sk_core_set_features(get_event_aggressively: bool, auto_save: bool) -> i32 {
    if core().is_none() {
        return SK_ERR_NOT_INITIALIZED;
    }
    GET_EVENT_AGGRESSIVELY.store(get_event_aggressively, Ordering::Release);
    AUTO_SAVE.store(auto_save, Ordering::Release);
    SK_OK
}

/// Move the overlay's modal handlers to the front of `window`'s list.
///
/// # Safety
/// `window` must be null or a live host window.
#[no_mangle]
pub unsafe extern "C" fn sk_sort_modal_handlers(window: *mut c_void) -> i32 {
    guarded(SK_ERR_PANIC, || {
        let Some(core) = core() else { return SK_ERR_NOT_INITIALIZED };
        if !GET_EVENT_AGGRESSIVELY.load(Ordering::Acquire) {
            return SK_SORT_DISABLED;
        }
        match reorder::bring_to_front(core.layouts, Address::from(window), &core.own_idname) {
            ReorderOutcome::Unchanged => SK_SORT_UNCHANGED,
            ReorderOutcome::Reordered { .. } => SK_SORT_REORDERED,
            ReorderOutcome::AbortedUiHandler => SK_SORT_ABORTED_UI,
        }
    })
}

/// 1 when a modal operator other than ours runs in any of the windows,
/// 0 otherwise.
///
/// # Safety
/// `windows` must be null or point to `count` live host windows.
#[no_mangle]
pub unsafe extern "C" fn sk_should_block_save(windows: *const *mut c_void, count: usize) -> i32 {
    guarded(SK_ERR_PANIC, || {
        let Some(core) = core() else { return SK_ERR_NOT_INITIALIZED };
        let windows = window_slice(windows, count);
        autosave::should_block_save(core.layouts, &windows, &core.own_idname) as i32
    })
}

/// Claim the next background save. 1 means the add-on should write the
/// auto-save file now and report back through `sk_autosave_finish`.
///
/// `existing_mtime` is the modification time of the current auto-save file
/// in seconds since the epoch, or negative if there is none.
///
/// # Safety
/// `windows` must be null or point to `count` live host windows.
#[no_mangle]
pub unsafe extern "C" fn sk_autosave_try_begin(
    windows: *const *mut c_void,
    count: usize,
    interval_secs: u32,
    existing_mtime: f64,
) -> i32 {
    guarded(SK_ERR_PANIC, || {
        let Some(core) = core() else { return SK_ERR_NOT_INITIALIZED };
        if !AUTO_SAVE.load(Ordering::Acquire) {
            return 0;
        }
        let now = SystemTime::now();
        let mut timer = timer();
        timer.set_interval(Duration::from_secs(u64::from(interval_secs)));
        if let Some(mtime) = epoch_secs(existing_mtime) {
            timer.observe_existing(mtime);
        }
        if !timer.is_due(now) {
            return 0;
        }
        let windows = window_slice(windows, count);
        if autosave::should_block_save(core.layouts, &windows, &core.own_idname) {
            return 0;
        }
        timer.begin(now) as i32
    })
}

/// Release the save claimed by `sk_autosave_try_begin`. `saved_mtime` is the
/// new file's modification time, or negative if the save failed.
#[no_mangle]
pub extern "C" fn sk_autosave_finish(saved_mtime: f64) -> i32 {
    guarded(SK_ERR_PANIC, || {
        let saved = epoch_secs(saved_mtime);
        if saved.is_none() {
            warn!("auto save failed");
        }
        timer().finish(saved);
        SK_OK
    })
}

/// Write the auto-save file name for `blend_path` (null when unsaved) into
/// `out`. Returns the name's length, or `SK_ERR_CONFIG` if `out` is too
/// small or the path is not UTF-8.
///
/// # Safety
/// `blend_path` must be null or NUL-terminated; `out` must hold `cap` bytes.
#[no_mangle]
pub unsafe extern "C" fn sk_autosave_basename(blend_path: *const c_char, pid: u32, out: *mut c_char, cap: usize) -> i32 {
    guarded(SK_ERR_PANIC, || {
        let path = if blend_path.is_null() {
            None
        } else {
            match CStr::from_ptr(blend_path).to_str() {
                Ok(s) => Some(Path::new(s)),
                Err(_) => return SK_ERR_CONFIG,
            }
        };
        let name = autosave::autosave_basename(path, pid);
        if out.is_null() || name.len() + 1 > cap {
            return SK_ERR_CONFIG;
        }
        std::ptr::copy_nonoverlapping(name.as_ptr(), out.cast::<u8>(), name.len());
        *out.add(name.len()) = 0;
        name.len() as i32
    })
}

/// Log `window`'s modal handlers at debug level; returns how many there are.
///
/// # Safety
/// `window` must be null or a live host window.
#[no_mangle]
pub unsafe extern "C" fn sk_log_modal_handlers(window: *mut c_void) -> i32 {
    guarded(SK_ERR_PANIC, || {
        let Some(core) = core() else { return SK_ERR_NOT_INITIALIZED };
        let mut count = 0;
        for (i, rec) in inspector::inspect(core.layouts, Address::from(window)).enumerate() {
            debug!(
                index = i,
                handler = %rec.address,
                kind = %rec.kind,
                operator = rec.operator_idname.as_deref().unwrap_or("-"),
                area = %rec.area,
                region = %rec.region,
                "modal handler"
            );
            count += 1;
        }
        count
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::v3_4;
    use crate::sim::{walk_checked, window_with, Fake, HostArena};
    use pretty_assertions::assert_eq;

    #[test]
    fn resolve_core_by_version() {
        let cfg = Config::default();
        let core = resolve_core(HostVersion::new(3, 4, 1), &cfg).unwrap();
        assert_eq!(core.layouts.name, "v3_4");
        assert_eq!(core.own_idname, "wm.sk_screencast_keys");

        let err = resolve_core(HostVersion::new(4, 2, 0), &cfg).unwrap_err();
        assert_eq!(err, LayoutError::UnsupportedVersion(HostVersion::new(4, 2, 0)));
        assert_eq!(error_code(&err), SK_ERR_UNSUPPORTED_VERSION);
    }

    #[test]
    fn guarded_swallows_panics() {
        assert_eq!(guarded(-1, || 7), 7);
        assert_eq!(guarded(-1, || -> i32 { panic!("boom") }), -1);
    }

    #[test]
    fn epoch_seconds_from_host() {
        assert_eq!(epoch_secs(-1.0), None);
        assert_eq!(epoch_secs(f64::NAN), None);
        assert_eq!(epoch_secs(10.0), Some(SystemTime::UNIX_EPOCH + Duration::from_secs(10)));
    }

    #[test]
    fn basename_into_caller_buffer() {
        let mut buf = [0 as c_char; 32];
        let path = std::ffi::CString::new("/tmp/shot.blend").unwrap();
        let n = unsafe { sk_autosave_basename(path.as_ptr(), 9, buf.as_mut_ptr(), buf.len()) };
        assert_eq!(n, "shot.blend".len() as i32);
        assert_eq!(unsafe { CStr::from_ptr(buf.as_ptr()) }.to_str().unwrap(), "shot.blend");

        let n = unsafe { sk_autosave_basename(std::ptr::null(), 77, buf.as_mut_ptr(), buf.len()) };
        assert_eq!(n, "77.blend".len() as i32);
        assert_eq!(unsafe { CStr::from_ptr(buf.as_ptr()) }.to_str().unwrap(), "77.blend");

        let mut tiny = [0 as c_char; 4];
        assert_eq!(unsafe { sk_autosave_basename(path.as_ptr(), 9, tiny.as_mut_ptr(), tiny.len()) }, SK_ERR_CONFIG);
    }

    /// The only test that touches the process-wide core, so the toggles it
    /// flips cannot race another test.
    #[test]
    fn exported_calls_after_init() {
        let cfg = std::ffi::CString::new(r#"{"get_event_aggressively": false}"#).unwrap();
        assert_eq!(unsafe { sk_core_init(3, 4, 0, cfg.as_ptr()) }, SK_OK);
        assert_eq!(sk_core_is_supported(), 1);

        let mut host = HostArena::new(&v3_4::LAYOUT);
        let (win, hs) = window_with(
            &mut host,
            &[Fake::Op("VIEW3D_OT_fly"), Fake::Keymap, Fake::Op("WM_OT_sk_screencast_keys")],
        );
        let raw = win.get() as *mut c_void;

        assert_eq!(unsafe { sk_sort_modal_handlers(raw) }, SK_SORT_DISABLED);
        assert_eq!(unsafe { sk_log_modal_handlers(raw) }, 3);

        assert_eq!(sk_core_set_features(true, false), SK_OK);
        assert_eq!(unsafe { sk_sort_modal_handlers(raw) }, SK_SORT_REORDERED);
        assert_eq!(walk_checked(&host, win), vec![hs[2], hs[0], hs[1]]);
        assert_eq!(unsafe { sk_sort_modal_handlers(raw) }, SK_SORT_UNCHANGED);

        let windows = [raw];
        assert_eq!(unsafe { sk_should_block_save(windows.as_ptr(), 1) }, 1);
        assert_eq!(unsafe { sk_should_block_save(std::ptr::null(), 0) }, 0);
        assert_eq!(unsafe { sk_autosave_try_begin(windows.as_ptr(), 1, 0, -1.0) }, 0, "auto save off");

        let (quiet, _) = window_with(&mut host, &[Fake::Op("WM_OT_sk_screencast_keys")]);
        let quiet = [quiet.get() as *mut c_void];
        assert_eq!(sk_core_set_features(true, true), SK_OK);
        assert_eq!(unsafe { sk_autosave_try_begin(windows.as_ptr(), 1, 0, -1.0) }, 0, "blocked by view3d.fly");
        assert_eq!(unsafe { sk_autosave_try_begin(quiet.as_ptr(), 1, 0, -1.0) }, 1);
        assert_eq!(unsafe { sk_autosave_try_begin(quiet.as_ptr(), 1, 0, -1.0) }, 0, "save in flight");
        assert_eq!(sk_autosave_finish(-1.0), SK_OK);
        assert_eq!(unsafe { sk_autosave_try_begin(quiet.as_ptr(), 1, 0, -1.0) }, 1);
        assert_eq!(sk_autosave_finish(1.0), SK_OK);

        // A second init keeps the resolved core.
        assert_eq!(unsafe { sk_core_init(3, 4, 2, std::ptr::null()) }, SK_OK);
        assert_eq!(core().map(|c| c.version), Some(HostVersion::new(3, 4, 0)));
        assert_eq!(unsafe { sk_sort_modal_handlers(raw) }, SK_SORT_DISABLED);

        // A rejected config switches off whatever an earlier init enabled.
        let both = std::ffi::CString::new(r#"{"get_event_aggressively": true, "auto_save": true}"#).unwrap();
        assert_eq!(unsafe { sk_core_init(3, 4, 0, both.as_ptr()) }, SK_OK);
        assert_eq!(unsafe { sk_sort_modal_handlers(raw) }, SK_SORT_UNCHANGED);
        let bad = std::ffi::CString::new("{not json").unwrap();
        assert_eq!(unsafe { sk_core_init(3, 4, 0, bad.as_ptr()) }, SK_ERR_CONFIG);
        assert_eq!(unsafe { sk_sort_modal_handlers(raw) }, SK_SORT_DISABLED);
        assert_eq!(unsafe { sk_autosave_try_begin(quiet.as_ptr(), 1, 0, -1.0) }, 0);
    }
}
