//! qc-bridge: C ABI over the QuietCall denoiser
//!
//! Streams and models are addressed by opaque `u64` handles. Handles come
//! from one counter and are never reused, so a stale handle is reported
//! as unknown instead of reaching another stream.
//!
//! Each stream sits behind its own mutex. A second thread entering
//! `qc_denoise_process_frame` on a handle that is already in use gets
//! `QcStatus::Busy` back rather than waiting.
//!
//! Models created with `qc_model_create` are shared by `Arc`; destroying a
//! model handle never invalidates streams created from it. Transform
//! plans and the band table are built once and shared by every stream.

pub mod status;

pub use status::QcStatus;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::{Mutex, RwLock};
use qc_denoise::{DenoiseConfig, DenoiseEngine, DenoiseState, FRAME_SIZE};
use qc_rnn::{ModelWeights, NB_INPUTS, NB_OUTPUTS};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{CStr, CString, c_char};
use std::ptr;
use std::slice;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// ═══════════════════════════════════════════════════════════════════════════════
// GLOBAL STATE
// ═══════════════════════════════════════════════════════════════════════════════

type StreamSlot = Arc<Mutex<DenoiseState>>;

/// Live streams
static STREAMS: Lazy<RwLock<HashMap<u64, StreamSlot>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Models registered by the host
static MODELS: Lazy<RwLock<HashMap<u64, Arc<ModelWeights>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Transform plans and band table for every stream
static ENGINE: OnceCell<DenoiseEngine> = OnceCell::new();

/// Next handle for streams and models alike; 0 is never issued
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn allocate_handle() -> u64 {
    NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)
}

fn set_error(msg: impl Into<String>) {
    let msg = msg.into();
    log::warn!("{msg}");
    LAST_ERROR.with(|slot| {
        *slot.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_error() {
    LAST_ERROR.with(|slot| {
        *slot.borrow_mut() = None;
    });
}

fn lookup_stream(handle: u64) -> Option<StreamSlot> {
    STREAMS.read().get(&handle).cloned()
}

fn lookup_model(model: u64) -> Option<Arc<ModelWeights>> {
    if model == 0 {
        return Some(ModelWeights::builtin());
    }
    MODELS.read().get(&model).cloned()
}

fn register_stream(state: DenoiseState) -> u64 {
    let handle = allocate_handle();
    STREAMS.write().insert(handle, Arc::new(Mutex::new(state)));
    log::debug!("Registered denoise stream {handle}");
    handle
}

/// Build a stream on the shared engine and register it, or 0 on error
fn create_stream(weights: Arc<ModelWeights>, config: DenoiseConfig) -> u64 {
    let stream = ENGINE
        .get_or_try_init(DenoiseEngine::with_builtin)
        .and_then(|engine| engine.create_stream_with(weights, config));

    match stream {
        Ok(state) => {
            clear_error();
            register_stream(state)
        }
        Err(e) => {
            set_error(format!("Stream creation failed: {e}"));
            0
        }
    }
}

/// True if two `len`-sample buffers share any memory
fn overlaps(a: *const i16, b: *const i16, len: usize) -> bool {
    let bytes = len * size_of::<i16>();
    let (a, b) = (a as usize, b as usize);
    a < b.saturating_add(bytes) && b < a.saturating_add(bytes)
}

/// Copy a host array of `len` floats, rejecting null
///
/// # Safety
/// `data` must be null or point to `len` readable floats.
unsafe fn copy_floats(data: *const f32, len: usize) -> Option<Vec<f32>> {
    if data.is_null() {
        return None;
    }
    // SAFETY: caller guarantees `len` readable floats behind a non-null pointer
    Some(unsafe { slice::from_raw_parts(data, len) }.to_vec())
}

// ═══════════════════════════════════════════════════════════════════════════════
// C ABI: GENERAL
// ═══════════════════════════════════════════════════════════════════════════════

/// Samples per frame expected by `qc_denoise_process_frame`
#[unsafe(no_mangle)]
pub extern "C" fn qc_frame_size() -> u32 {
    FRAME_SIZE as u32
}

/// Route `log` output to stderr, filtered by `RUST_LOG`
///
/// Safe to call more than once.
#[unsafe(no_mangle)]
pub extern "C" fn qc_init_logging() {
    let _ = env_logger::Builder::from_default_env().try_init();
}

/// Message of the last failure on the calling thread, or null
///
/// The pointer stays valid until the next failing call on this thread.
#[unsafe(no_mangle)]
pub extern "C" fn qc_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| match slot.borrow().as_ref() {
        Some(msg) => msg.as_ptr(),
        None => ptr::null(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// C ABI: STREAMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Create a stream over `model` (0 = built-in model)
///
/// # Returns
///
/// Stream handle (> 0) or 0 on error
#[unsafe(no_mangle)]
pub extern "C" fn qc_denoise_create(model: u64) -> u64 {
    let Some(weights) = lookup_model(model) else {
        set_error(format!("Unknown model handle {model}"));
        return 0;
    };

    create_stream(weights, DenoiseConfig::default())
}

/// Create a stream with a JSON config (null = defaults)
///
/// # Safety
///
/// `config_json` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qc_denoise_create_with_config(
    model: u64,
    config_json: *const c_char,
) -> u64 {
    let config = if config_json.is_null() {
        DenoiseConfig::default()
    } else {
        // SAFETY: caller guarantees a valid NUL-terminated string
        let json = match unsafe { CStr::from_ptr(config_json) }.to_str() {
            Ok(s) => s,
            Err(_) => {
                set_error("Invalid UTF-8 in config JSON");
                return 0;
            }
        };
        match DenoiseConfig::from_json(json) {
            Ok(config) => config,
            Err(e) => {
                set_error(format!("Invalid config: {e}"));
                return 0;
            }
        }
    };

    let Some(weights) = lookup_model(model) else {
        set_error(format!("Unknown model handle {model}"));
        return 0;
    };

    create_stream(weights, config)
}

/// Denoise one frame
///
/// # Arguments
///
/// * `handle` - Stream handle from `qc_denoise_create`
/// * `out` - Output buffer of `out_len` samples
/// * `input` - Input buffer of `in_len` samples
///
/// Both lengths must equal `qc_frame_size()` and the buffers must not
/// overlap; use `qc_denoise_process_frame_in_place` for in-place work.
///
/// # Returns
///
/// VAD probability in [0, 1], or a negative `QcStatus` code
///
/// # Safety
///
/// - `out` must be null or valid for `out_len` writes
/// - `input` must be null or valid for `in_len` reads
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qc_denoise_process_frame(
    handle: u64,
    out: *mut i16,
    out_len: usize,
    input: *const i16,
    in_len: usize,
) -> f32 {
    if out.is_null() || input.is_null() {
        set_error("Null frame buffer");
        return QcStatus::InvalidArgument.as_f32();
    }
    if out_len != FRAME_SIZE || in_len != FRAME_SIZE {
        set_error(format!(
            "Frame length must be {FRAME_SIZE}, got in {in_len} / out {out_len}"
        ));
        return QcStatus::InvalidArgument.as_f32();
    }
    if overlaps(out, input, FRAME_SIZE) {
        set_error("Input and output buffers overlap");
        return QcStatus::InvalidArgument.as_f32();
    }

    let Some(slot) = lookup_stream(handle) else {
        set_error(format!("Unknown stream handle {handle}"));
        return QcStatus::UnknownHandle.as_f32();
    };
    let Some(mut state) = slot.try_lock() else {
        set_error(format!("Stream {handle} is busy"));
        return QcStatus::Busy.as_f32();
    };

    // SAFETY: non-null, FRAME_SIZE long per the caller contract, and
    // checked not to overlap
    let (output, input) = unsafe {
        (
            slice::from_raw_parts_mut(out, FRAME_SIZE),
            slice::from_raw_parts(input, FRAME_SIZE),
        )
    };

    match state.process_frame(output, input) {
        Ok(vad) => vad,
        Err(e) => {
            set_error(format!("Frame processing failed: {e}"));
            QcStatus::from(&e).as_f32()
        }
    }
}

/// Denoise one frame, overwriting `samples`
///
/// # Returns
///
/// VAD probability in [0, 1], or a negative `QcStatus` code
///
/// # Safety
///
/// `samples` must be null or valid for `len` reads and writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qc_denoise_process_frame_in_place(
    handle: u64,
    samples: *mut i16,
    len: usize,
) -> f32 {
    if samples.is_null() {
        set_error("Null frame buffer");
        return QcStatus::InvalidArgument.as_f32();
    }
    if len != FRAME_SIZE {
        set_error(format!("Frame length must be {FRAME_SIZE}, got {len}"));
        return QcStatus::InvalidArgument.as_f32();
    }

    let mut input = [0i16; FRAME_SIZE];
    // SAFETY: non-null and FRAME_SIZE long per the caller contract
    input.copy_from_slice(unsafe { slice::from_raw_parts(samples, FRAME_SIZE) });

    // SAFETY: `input` is a local copy, so the buffers cannot overlap
    unsafe { qc_denoise_process_frame(handle, samples, len, input.as_ptr(), FRAME_SIZE) }
}

/// Reset a stream to its freshly created state
///
/// # Returns
///
/// 0 on success, negative `QcStatus` code on failure
#[unsafe(no_mangle)]
pub extern "C" fn qc_denoise_reset(handle: u64) -> i32 {
    let Some(slot) = lookup_stream(handle) else {
        set_error(format!("Unknown stream handle {handle}"));
        return QcStatus::UnknownHandle.code();
    };
    let Some(mut state) = slot.try_lock() else {
        set_error(format!("Stream {handle} is busy"));
        return QcStatus::Busy.code();
    };

    state.reset();
    QcStatus::Ok.code()
}

/// VAD probability of the stream's last frame, or a negative code
#[unsafe(no_mangle)]
pub extern "C" fn qc_denoise_vad(handle: u64) -> f32 {
    let Some(slot) = lookup_stream(handle) else {
        set_error(format!("Unknown stream handle {handle}"));
        return QcStatus::UnknownHandle.as_f32();
    };
    match slot.try_lock() {
        Some(state) => state.vad_probability(),
        None => {
            set_error(format!("Stream {handle} is busy"));
            QcStatus::Busy.as_f32()
        }
    }
}

/// Destroy a stream
///
/// A frame already in flight on another thread finishes first; the
/// stream is dropped when it returns.
///
/// # Returns
///
/// 0 on success, -1 if the handle is unknown
#[unsafe(no_mangle)]
pub extern "C" fn qc_denoise_destroy(handle: u64) -> i32 {
    match STREAMS.write().remove(&handle) {
        Some(_) => {
            log::debug!("Destroyed denoise stream {handle}");
            QcStatus::Ok.code()
        }
        None => {
            set_error(format!("Unknown stream handle {handle}"));
            QcStatus::UnknownHandle.code()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// C ABI: MODELS
// ═══════════════════════════════════════════════════════════════════════════════

/// Register a model from flat row-major arrays
///
/// # Arguments
///
/// * `n_hidden` - Hidden units
/// * `input_w` / `input_b` - `n_hidden x 68` weights and `n_hidden` biases
/// * `rec_w` / `rec_b` - `n_hidden x n_hidden` weights and `n_hidden` biases
/// * `out_w` / `out_b` - `23 x n_hidden` weights and 23 biases
///
/// The arrays are copied; the host may free them on return.
///
/// # Returns
///
/// Model handle (> 0) or 0 on error
///
/// # Safety
///
/// Every pointer must be null or valid for the length given above.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qc_model_create(
    n_hidden: u32,
    input_w: *const f32,
    input_b: *const f32,
    rec_w: *const f32,
    rec_b: *const f32,
    out_w: *const f32,
    out_b: *const f32,
) -> u64 {
    let hidden = n_hidden as usize;
    if hidden == 0 {
        set_error("Model needs at least 1 hidden unit");
        return 0;
    }
    // SAFETY: caller guarantees each pointer is null or long enough
    let arrays = unsafe {
        (
            copy_floats(input_w, hidden * NB_INPUTS),
            copy_floats(input_b, hidden),
            copy_floats(rec_w, hidden * hidden),
            copy_floats(rec_b, hidden),
            copy_floats(out_w, NB_OUTPUTS * hidden),
            copy_floats(out_b, NB_OUTPUTS),
        )
    };
    let (Some(iw), Some(ib), Some(rw), Some(rb), Some(ow), Some(ob)) = arrays else {
        set_error("Null model array");
        return 0;
    };

    match ModelWeights::from_flat(hidden, iw, ib, rw, rb, ow, ob) {
        Ok(model) => {
            let handle = allocate_handle();
            MODELS.write().insert(handle, Arc::new(model));
            clear_error();
            log::debug!("Registered model {handle} ({hidden} hidden units)");
            handle
        }
        Err(e) => {
            set_error(format!("Invalid model: {e}"));
            0
        }
    }
}

/// Unregister a model; streams using it keep working
///
/// # Returns
///
/// 0 on success, -1 if the handle is unknown
#[unsafe(no_mangle)]
pub extern "C" fn qc_model_destroy(model: u64) -> i32 {
    match MODELS.write().remove(&model) {
        Some(_) => QcStatus::Ok.code(),
        None => {
            set_error(format!("Unknown model handle {model}"));
            QcStatus::UnknownHandle.code()
        }
    }
}
