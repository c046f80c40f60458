/// Integration tests for the numeric kernels: delta transforms, linear
/// prediction, the rANS coder, and the entropy frame around it.
use ephc_core::delta;
use ephc_core::frame::{decode_frame, encode_frame};
use ephc_core::lpc::{self, FitOptions};
use ephc_core::{EntropyCoder, Error, RansCoder, Sample, Shape, Signal};

/// Generate `len` deterministic values using a simple LCG.
fn pseudo_random(len: usize, seed: u64) -> Vec<u64> {
    let mut rng = seed;
    (0..len)
        .map(|_| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            rng >> 11
        })
        .collect()
}

/// Smooth correlated channels with a little noise, like a slow ephys trace.
fn smooth_signal(rows: usize, cols: usize, seed: u64) -> Signal<i16> {
    let noise = pseudo_random(rows * cols, seed);
    let data = (0..rows * cols)
        .map(|i| {
            let (t, ch) = (i / cols, i % cols);
            let phase = t as f64 * 0.05 + ch as f64;
            (phase.sin() * 800.0) as i16 + (noise[i] % 9) as i16 - 4
        })
        .collect();
    Signal::new(data, Shape::new(rows, cols)).unwrap()
}

// ── delta ──────────────────────────────────────────────────────────────────

#[test]
fn test_delta_concrete_scenario() {
    let x = Signal::<i16>::from_rows(&[vec![0, 100], vec![1, 101], vec![3, 104], vec![6, 110]]).unwrap();
    let d = delta::encode(&x).unwrap();
    assert_eq!(d.first, vec![0, 100]);
    assert_eq!(d.diff, Signal::from_rows(&[vec![1, 1], vec![2, 2], vec![3, 3]]).unwrap());
    assert_eq!(delta::decode(&d.first, &d.diff).unwrap(), x);
}

#[test]
fn test_delta2_roundtrip_and_shape() {
    let x = smooth_signal(50, 4, 7);
    let d = delta::encode2(&x).unwrap();
    assert_eq!(d.diff2.shape(), Shape::new(48, 4));
    assert_eq!(d.first, x.row(0));
    assert_eq!(d.second, x.row(1));
    assert_eq!(delta::decode2(&d.first, &d.second, &d.diff2).unwrap(), x);
}

#[test]
fn test_delta_wraps_in_native_width() {
    let x = Signal::<u8>::from_rows(&[vec![250], vec![3], vec![255], vec![0]]).unwrap();
    let d = delta::encode(&x).unwrap();
    assert_eq!(d.diff.as_slice(), &[9, 252, 1]);
    assert_eq!(delta::decode(&d.first, &d.diff).unwrap(), x);

    let d2 = delta::encode2(&x).unwrap();
    assert_eq!(delta::decode2(&d2.first, &d2.second, &d2.diff2).unwrap(), x);
}

#[test]
fn test_delta_rejects_short_signals() {
    let one = Signal::<i32>::from_rows(&[vec![1, 2]]).unwrap();
    assert!(matches!(delta::encode(&one), Err(Error::InvalidShape(_))));

    let two = Signal::<i32>::from_rows(&[vec![1], vec![2]]).unwrap();
    assert!(delta::encode(&two).is_ok());
    assert!(matches!(delta::encode2(&two), Err(Error::InvalidShape(_))));
}

// ── lpc ────────────────────────────────────────────────────────────────────

#[test]
fn test_lpc_fits_a_ramp() {
    let ramp: Vec<i16> = (0..10).map(|i| 2 * i).collect();
    let x = Signal::new(ramp, Shape::new(10, 1)).unwrap();
    let p = lpc::fit(&x, 2, &FitOptions::default()).unwrap();

    let c = &p.coefficients()[0];
    assert!((c[0] - 2.0).abs() < 1e-3, "c0 = {}", c[0]);
    assert!((c[1] + 1.0).abs() < 1e-3, "c1 = {}", c[1]);

    let r = lpc::residuals(&x, &p).unwrap();
    assert_eq!(r.shape(), Shape::new(8, 1));
    assert!(r.as_slice().iter().all(|v| v.abs() <= 1));
}

#[test]
fn test_lpc_exact_roundtrip_all_orders() {
    let x = smooth_signal(300, 3, 11);
    for order in [0, 1, 2, 8, 16] {
        let p = lpc::fit(&x, order, &FitOptions::default()).unwrap();
        let initial = lpc::initial_values(&x, order).unwrap();
        let r = lpc::residuals(&x, &p).unwrap();
        assert_eq!(lpc::reconstruct(&p, &r, &initial).unwrap(), x, "order {order}");
    }
}

#[test]
fn test_lpc_order_must_be_below_length() {
    let x = smooth_signal(4, 2, 1);
    assert!(matches!(
        lpc::fit(&x, 4, &FitOptions::default()),
        Err(Error::InvalidOrder { order: 4, length: 4 })
    ));
}

#[test]
fn test_lpc_constant_channel_falls_back() {
    let x = Signal::new(vec![7u16; 200], Shape::new(100, 2)).unwrap();
    let p = lpc::fit(&x, 4, &FitOptions::default()).unwrap();
    assert!(p.coefficients().iter().flatten().all(|c| c.is_finite()));

    let r = lpc::residuals(&x, &p).unwrap();
    let initial = lpc::initial_values(&x, 4).unwrap();
    assert_eq!(lpc::reconstruct(&p, &r, &initial).unwrap(), x);
}

#[test]
fn test_lpc_lossy_error_within_step() {
    let x = smooth_signal(400, 2, 3);
    let p = lpc::fit(&x, 8, &FitOptions::default()).unwrap();
    let initial = lpc::initial_values(&x, 8).unwrap();
    for step in [1u32, 3, 7, 17, 33] {
        let q = lpc::residuals_lossy(&x, &p, step).unwrap();
        assert!(q.as_slice().iter().all(|v| v.to_i64() % i64::from(step) == 0));
        let y = lpc::reconstruct(&p, &q, &initial).unwrap();
        let worst = x
            .as_slice()
            .iter()
            .zip(y.as_slice())
            .map(|(a, b)| (i64::from(*a) - i64::from(*b)).abs())
            .max()
            .unwrap();
        assert!(worst <= i64::from(step), "step {step}: error {worst}");
        if step == 1 {
            assert_eq!(y, x);
        }
    }
}

#[test]
fn test_lpc_lossy_stays_inside_narrow_dtype() {
    // values hugging both ends of u8 force the overflow adjustment
    let data: Vec<u8> = (0..200).map(|t| if (t / 5) % 2 == 0 { 254 } else { 1 }).collect();
    let x = Signal::new(data, Shape::new(200, 1)).unwrap();
    let p = lpc::fit(&x, 2, &FitOptions::default()).unwrap();
    let q = lpc::residuals_lossy(&x, &p, 33).unwrap();
    let y = lpc::reconstruct(&p, &q, &lpc::initial_values(&x, 2).unwrap()).unwrap();
    for (a, b) in x.as_slice().iter().zip(y.as_slice()) {
        assert!((i64::from(*a) - i64::from(*b)).abs() <= 33);
    }
}

#[test]
fn test_lpc_zero_step_is_invalid() {
    let x = smooth_signal(20, 1, 5);
    let p = lpc::fit(&x, 2, &FitOptions::default()).unwrap();
    assert!(matches!(
        lpc::residuals_lossy(&x, &p, 0),
        Err(Error::InvalidStep { step: 0 })
    ));
}

#[test]
fn test_predictor_bytes_roundtrip() {
    let x = smooth_signal(100, 3, 9);
    let p = lpc::fit(&x, 4, &FitOptions::default()).unwrap();
    let bytes = p.to_le_bytes();
    assert_eq!(bytes.len(), 3 * 4 * 4);
    assert_eq!(lpc::Predictor::from_le_bytes(&bytes, 3, 4).unwrap(), p);
    assert!(matches!(
        lpc::Predictor::from_le_bytes(&bytes[1..], 3, 4),
        Err(Error::CorruptHeader(_))
    ));
}

// ── rANS and frame ─────────────────────────────────────────────────────────

fn rans_roundtrip<T: Sample>(symbols: &[T]) {
    let coder = RansCoder::default();
    let encoded = coder.encode(symbols).unwrap();
    assert_eq!(encoded.signal_length as usize, symbols.len());
    assert_eq!(coder.decode(&encoded).unwrap(), symbols);
}

#[test]
fn test_rans_roundtrip_across_dtypes() {
    let noise = pseudo_random(5000, 42);
    rans_roundtrip::<u8>(&noise.iter().map(|&v| (v % 7) as u8).collect::<Vec<_>>());
    rans_roundtrip::<u16>(&noise.iter().map(|&v| v as u16).collect::<Vec<_>>());
    rans_roundtrip::<u32>(&noise.iter().map(|&v| v as u32).collect::<Vec<_>>());
    rans_roundtrip::<i16>(&noise.iter().map(|&v| (v % 41) as i16 - 20).collect::<Vec<_>>());
    rans_roundtrip::<i32>(&noise.iter().map(|&v| v as i32).collect::<Vec<_>>());
}

#[test]
fn test_rans_edge_cases() {
    rans_roundtrip::<i16>(&[]);
    rans_roundtrip::<i16>(&[5]);
    rans_roundtrip::<i16>(&[-3; 1000]);
    rans_roundtrip::<u8>(&(0..=255).collect::<Vec<u8>>());
    // one dominant symbol with rare outliers
    let mut skewed = vec![0i32; 10_000];
    skewed[17] = i32::MIN;
    skewed[9_000] = i32::MAX;
    rans_roundtrip(&skewed);
}

#[test]
fn test_rans_compresses_low_entropy_input() {
    let noise = pseudo_random(20_000, 1);
    let symbols: Vec<i16> = noise.iter().map(|&v| (v % 4) as i16).collect();
    let encoded = RansCoder::default().encode(&symbols).unwrap();
    // two bits per symbol, give or take the final state
    assert!(encoded.words.len() * 32 < symbols.len() * 16 / 7);
}

#[test]
fn test_frame_roundtrip_with_and_without_shape() {
    let x = smooth_signal(64, 2, 21);
    let coder = RansCoder::default();
    for shape in [Some(x.shape()), None] {
        let frame = encode_frame(coder.encode(x.as_slice()).unwrap(), shape).unwrap();
        let (header, encoded) = decode_frame::<i16>(&frame, shape.is_some()).unwrap();
        assert_eq!(header.shape, shape.map(|s| vec![s.rows as u32, s.cols as u32]));
        assert_eq!(header.decoded_length, 128);
        assert_eq!(coder.decode(&encoded).unwrap(), x.as_slice());
    }
}

#[test]
fn test_frame_truncated_words_are_corrupt() {
    let x = smooth_signal(256, 1, 2);
    let frame = encode_frame(RansCoder::default().encode(x.as_slice()).unwrap(), None).unwrap();
    let err = decode_frame::<i16>(&frame[..frame.len() - 2], false).unwrap_err();
    assert!(matches!(err, Error::CorruptHeader(_)), "{err}");

    let err = decode_frame::<i16>(&frame[..3], false).unwrap_err();
    assert!(matches!(err, Error::CorruptHeader(_)), "{err}");
}

#[test]
fn test_frame_dtype_is_checked() {
    let frame = encode_frame(RansCoder::default().encode(&[1i32, 2, 3]).unwrap(), None).unwrap();
    assert!(matches!(
        decode_frame::<u32>(&frame, false),
        Err(Error::DtypeMismatch { .. })
    ));
}
