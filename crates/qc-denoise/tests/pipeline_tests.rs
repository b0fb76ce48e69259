//! Denoiser pipeline tests
//!
//! Drives full streams frame by frame and checks:
//! - Silent input stays silent with low VAD
//! - Bit-exact determinism for identical state and input
//! - Reset equivalence with a fresh stream
//! - Rejected calls leave the stream untouched
//! - Output energy bounded by input energy
//! - A steady loud tone keeps its level across frame edges
//! - Overflowing model weights never leak NaN
//! - Streams on separate threads are independent

use proptest::prelude::*;
use qc_denoise::{DenoiseEngine, DenoiseError, DenoiseState, FRAME_SIZE, ModelWeights};
use qc_rnn::{NB_INPUTS, NB_OUTPUTS};
use std::sync::Arc;

/// Overlap-add sums two frames per sample, each no louder than its input
const OVERLAP_ENERGY_FACTOR: f64 = 2.1;

/// Deterministic white noise at the given peak amplitude
fn generate_noise(samples: usize, seed: u64, amplitude: f32) -> Vec<i16> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    (0..samples)
        .map(|i| {
            let mut hasher = DefaultHasher::new();
            (seed, i).hash(&mut hasher);
            let unit = (hasher.finish() as f64 / u64::MAX as f64) * 2.0 - 1.0;
            (unit as f32 * amplitude) as i16
        })
        .collect()
}

/// Voiced-like pulse train with a fixed period
fn generate_pulses(samples: usize, period: usize, amplitude: i16) -> Vec<i16> {
    (0..samples)
        .map(|i| if i % period == 0 { amplitude } else { 0 })
        .collect()
}

fn energy(signal: &[i16]) -> f64 {
    signal.iter().map(|&x| (x as f64) * (x as f64)).sum()
}

/// Run every frame of `signal`, returning output and per-frame VAD
fn run(state: &mut DenoiseState, signal: &[i16]) -> (Vec<i16>, Vec<f32>) {
    let mut output = vec![0i16; signal.len()];
    let mut vads = Vec::new();
    for (input, out) in signal
        .chunks_exact(FRAME_SIZE)
        .zip(output.chunks_exact_mut(FRAME_SIZE))
    {
        vads.push(state.process_frame(out, input).unwrap());
    }
    (output, vads)
}

#[test]
fn test_silent_frame_scenario() {
    let mut state = DenoiseState::new(None).unwrap();
    let input = [0i16; FRAME_SIZE];
    let mut out = [123i16; FRAME_SIZE];

    let vad = state.process_frame(&mut out, &input).unwrap();

    assert!(vad < 0.1, "silent frame vad {vad}");
    assert!(out.iter().all(|&s| s == 0));
    assert!(state.gains().iter().all(|&g| (0.0..=0.1).contains(&g)));
}

#[test]
fn test_long_silence_stays_silent() {
    let mut state = DenoiseState::new(None).unwrap();
    let (output, vads) = run(&mut state, &vec![0i16; FRAME_SIZE * 50]);

    assert!(output.iter().all(|&s| s == 0));
    assert!(vads.iter().all(|&v| v < 0.1));
    assert_eq!(state.frames_processed(), 50);
}

#[test]
fn test_voiced_input_raises_vad() {
    let mut silent = DenoiseState::new(None).unwrap();
    let mut voiced = DenoiseState::new(None).unwrap();

    let (_, silent_vads) = run(&mut silent, &vec![0i16; FRAME_SIZE * 10]);
    let (_, voiced_vads) = run(&mut voiced, &generate_pulses(FRAME_SIZE * 10, 100, 10000));

    let silent_vad = silent_vads[silent_vads.len() - 1];
    let voiced_vad = voiced_vads[voiced_vads.len() - 1];
    assert!(voiced_vad > 0.5, "voiced vad {voiced_vad}");
    assert!(voiced_vad > silent_vad);

    let pitch = voiced.last_pitch();
    assert_eq!(pitch.lag, 100);
    assert!(pitch.strength > 0.99);
}

#[test]
fn test_bit_exact_determinism() {
    let mut a = DenoiseState::new(None).unwrap();
    let (_, _) = run(&mut a, &generate_noise(FRAME_SIZE * 8, 1, 6000.0));
    let mut b = a.clone();

    let frame = generate_noise(FRAME_SIZE, 2, 6000.0);
    let mut out_a = [0i16; FRAME_SIZE];
    let mut out_b = [0i16; FRAME_SIZE];
    let vad_a = a.process_frame(&mut out_a, &frame).unwrap();
    let vad_b = b.process_frame(&mut out_b, &frame).unwrap();

    assert_eq!(out_a, out_b);
    assert_eq!(vad_a.to_bits(), vad_b.to_bits());
    assert_eq!(a.gains(), b.gains());
}

#[test]
fn test_reset_matches_fresh_stream() {
    let signal = generate_noise(FRAME_SIZE * 6, 3, 12000.0);

    let mut used = DenoiseState::new(None).unwrap();
    run(&mut used, &generate_pulses(FRAME_SIZE * 5, 120, 20000));
    used.reset();
    assert_eq!(used.frames_processed(), 0);
    assert_eq!(used.vad_probability(), 0.0);

    let mut fresh = DenoiseState::new(None).unwrap();

    let (out_used, vad_used) = run(&mut used, &signal);
    let (out_fresh, vad_fresh) = run(&mut fresh, &signal);
    assert_eq!(out_used, out_fresh);
    assert_eq!(vad_used, vad_fresh);
}

#[test]
fn test_rejected_call_leaves_state_untouched() {
    let mut state = DenoiseState::new(None).unwrap();
    run(&mut state, &generate_noise(FRAME_SIZE * 4, 4, 3000.0));
    let mut reference = state.clone();

    let mut out = [0i16; FRAME_SIZE];
    let err = state
        .process_frame(&mut out, &[1i16; FRAME_SIZE - 1])
        .unwrap_err();
    assert!(matches!(
        err,
        DenoiseError::BufferMismatch {
            expected: FRAME_SIZE,
            got
        } if got == FRAME_SIZE - 1
    ));

    let mut short_out = [0i16; FRAME_SIZE + 1];
    assert!(
        state
            .process_frame(&mut short_out, &[1i16; FRAME_SIZE])
            .is_err()
    );
    assert_eq!(state.frames_processed(), reference.frames_processed());

    let frame = generate_noise(FRAME_SIZE, 5, 3000.0);
    let mut out_a = [0i16; FRAME_SIZE];
    let mut out_b = [0i16; FRAME_SIZE];
    let vad_a = state.process_frame(&mut out_a, &frame).unwrap();
    let vad_b = reference.process_frame(&mut out_b, &frame).unwrap();
    assert_eq!(out_a, out_b);
    assert_eq!(vad_a.to_bits(), vad_b.to_bits());
}

#[test]
fn test_full_scale_input_stays_bounded() {
    let mut state = DenoiseState::new(None).unwrap();
    let signal: Vec<i16> = (0..FRAME_SIZE * 20)
        .map(|i| if (i / 7) % 2 == 0 { i16::MAX } else { i16::MIN })
        .collect();

    let (output, vads) = run(&mut state, &signal);
    assert!(vads.iter().all(|v| (0.0..=1.0).contains(v)));
    assert!(state.gains().iter().all(|g| (0.0..=1.0).contains(g)));
    assert!(energy(&output) <= OVERLAP_ENERGY_FACTOR * energy(&signal));
}

#[test]
fn test_steady_tone_keeps_level_at_frame_edges() {
    const AMPLITUDE: f32 = 20000.0;
    let frames = 300;
    let tone: Vec<i16> = (0..FRAME_SIZE * frames)
        .map(|i| (AMPLITUDE * (2.0 * std::f32::consts::PI * i as f32 / 96.0).sin()) as i16)
        .collect();

    let mut state = DenoiseState::new(None).unwrap();
    let (output, _) = run(&mut state, &tone);

    // Output trails input by half a frame
    let hop = FRAME_SIZE / 2;
    let start = FRAME_SIZE * (frames - 1);
    for i in [0, 1, 24, hop - 1, hop, hop + 24, FRAME_SIZE - 24, FRAME_SIZE - 1] {
        let expected = tone[start + i - hop] as f32;
        let got = output[start + i] as f32;
        assert!(
            (got - expected).abs() < 0.02 * AMPLITUDE,
            "sample {i}: in {expected} / out {got}"
        );
    }

    let ratio = energy(&output[start..]) / energy(&tone[start - hop..start + hop]);
    assert!((0.95..=1.05).contains(&ratio), "energy ratio {ratio}");
}

#[test]
fn test_overflowing_model_keeps_stream_bounded() {
    // Both hidden units exceed 1 on loud input, so the opposite extreme
    // output weights overflow to inf - inf
    let mut input = vec![0.0f32; 2 * NB_INPUTS];
    input[0] = 1.0;
    input[NB_INPUTS] = 1.0;
    let output: Vec<f32> = (0..NB_OUTPUTS).flat_map(|_| [f32::MAX, -f32::MAX]).collect();
    let weights = ModelWeights::from_flat(
        2,
        input,
        vec![0.0; 2],
        vec![0.0; 4],
        vec![1.0; 2],
        output,
        vec![0.0; NB_OUTPUTS],
    )
    .unwrap();

    let mut state = DenoiseState::new(Some(Arc::new(weights))).unwrap();
    let (output, vads) = run(&mut state, &generate_noise(FRAME_SIZE * 5, 6, 12000.0));

    assert!(vads.iter().all(|&v| v == 0.0), "{vads:?}");
    assert!(state.gains().iter().all(|&g| g == 0.0));
    assert!(output.iter().all(|&s| s == 0));
}

#[test]
fn test_streams_on_threads_are_independent() {
    let engine = DenoiseEngine::with_builtin().unwrap();
    let signals: Vec<Vec<i16>> = (0..4)
        .map(|seed| generate_noise(FRAME_SIZE * 10, seed, 8000.0))
        .collect();

    let expected: Vec<Vec<i16>> = signals
        .iter()
        .map(|signal| run(&mut engine.create_stream().unwrap(), signal).0)
        .collect();

    let threaded: Vec<Vec<i16>> = std::thread::scope(|scope| {
        let handles: Vec<_> = signals
            .iter()
            .map(|signal| {
                let mut stream = engine.create_stream().unwrap();
                scope.spawn(move || run(&mut stream, signal).0)
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(threaded, expected);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn output_never_louder_than_input(
        frames in proptest::collection::vec(
            proptest::collection::vec(any::<i16>(), FRAME_SIZE),
            1..4,
        )
    ) {
        let mut state = DenoiseState::new(None).unwrap();
        let mut out = [0i16; FRAME_SIZE];
        let mut energy_in = 0.0;
        let mut energy_out = 0.0;

        for (count, frame) in frames.iter().enumerate() {
            let vad = state.process_frame(&mut out, frame).unwrap();
            prop_assert!((0.0..=1.0).contains(&vad));

            energy_in += energy(frame);
            energy_out += energy(&out);

            // Gains never amplify a frame; rounding adds at most 0.5 per sample
            let samples = ((count + 1) * FRAME_SIZE) as f64;
            let bound = (OVERLAP_ENERGY_FACTOR * energy_in).sqrt() + (samples * 0.25).sqrt();
            prop_assert!(energy_out.sqrt() <= bound + 1e-6);
        }
    }
}
