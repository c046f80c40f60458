/// Container, cache key, compatibility filter, and metrics tests.
use std::io::Cursor;

use ephc_core::compat::{is_compatible, DELTA_ENCODING, LPC_PREDICTION, REQUIRES_1D, ZERO_RLE};
use ephc_core::format::{Container, HEADER_SIZE, MAGIC};
use ephc_core::{
    loss_metrics, read_container, read_header, verify_lossless, write_container, AnySignal,
    CacheKey, Dtype, Error, Shape, Signal, SYSTEM_VERSION,
};

fn sample_container() -> Container {
    let payload: Vec<u8> = (0..1000u32).map(|i| (i * 31 % 251) as u8).collect();
    Container::new("ans-lpc8", "1.3", Dtype::I16, Shape::new(250, 2), payload)
}

fn write_to_vec(c: &Container) -> Vec<u8> {
    let mut buf = Vec::new();
    let written = write_container(&mut buf, c).unwrap();
    assert_eq!(written as usize, buf.len());
    buf
}

// ── container ──────────────────────────────────────────────────────────────

#[test]
fn test_container_roundtrip() {
    let c = sample_container();
    let buf = write_to_vec(&c);
    assert_eq!(buf.len(), HEADER_SIZE + "ans-lpc8".len() + "1.3".len() + 1000);
    assert_eq!(&buf[..8], MAGIC);

    let back = read_container(&mut Cursor::new(&buf)).unwrap();
    assert_eq!(back, c);

    let header = read_header(&mut Cursor::new(&buf)).unwrap();
    assert_eq!(header.dtype, Dtype::I16);
    assert_eq!(header.shape, Shape::new(250, 2));
    assert_eq!(header.payload_len, 1000);
}

#[test]
fn test_container_detects_payload_corruption() {
    let mut buf = write_to_vec(&sample_container());
    let last = buf.len() - 1;
    buf[last] ^= 0xFF;
    let err = read_container(&mut Cursor::new(&buf)).unwrap_err();
    assert!(matches!(err, Error::ChecksumMismatch { .. }), "{err}");
}

#[test]
fn test_container_rejects_bad_magic_and_version() {
    let good = write_to_vec(&sample_container());

    let mut bad_magic = good.clone();
    bad_magic[0] = b'X';
    assert!(matches!(
        read_container(&mut Cursor::new(&bad_magic)),
        Err(Error::CorruptHeader(_))
    ));

    let mut bad_version = good;
    bad_version[8] = 9;
    assert!(matches!(
        read_container(&mut Cursor::new(&bad_version)),
        Err(Error::CorruptHeader(_))
    ));
}

#[test]
fn test_container_truncated_header_is_io_error() {
    let buf = write_to_vec(&sample_container());
    let err = read_container(&mut Cursor::new(&buf[..HEADER_SIZE - 4])).unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err}");
}

#[test]
fn test_container_truncated_payload_is_corrupt() {
    let buf = write_to_vec(&sample_container());
    let err = read_container(&mut Cursor::new(&buf[..buf.len() - 10])).unwrap_err();
    assert!(matches!(err, Error::CorruptHeader(_)), "{err}");
}

#[test]
fn test_container_oversized_payload_len_is_corrupt() {
    let mut buf = write_to_vec(&sample_container());
    for declared in [u64::MAX, 1 << 40] {
        buf[20..28].copy_from_slice(&declared.to_le_bytes());
        let err = read_container(&mut Cursor::new(&buf)).unwrap_err();
        assert!(matches!(err, Error::CorruptHeader(_)), "{declared}: {err}");
    }
}

#[test]
fn test_container_version_check() {
    let c = sample_container();
    assert!(c.check_version("1.3").is_ok());
    match c.check_version("1.4") {
        Err(Error::VersionMismatch {
            algorithm,
            stored,
            current,
        }) => {
            assert_eq!(algorithm, "ans-lpc8");
            assert_eq!(stored, "1.3");
            assert_eq!(current, "1.4");
        }
        other => panic!("expected VersionMismatch, got {other:?}"),
    }
}

// ── cache key ──────────────────────────────────────────────────────────────

#[test]
fn test_cache_key_invalidation() {
    let key = CacheKey::new("synthetic-ephys", "1", "ans-lpc8", "1.3");
    assert_eq!(key.system_version, SYSTEM_VERSION);
    assert!(key.is_valid_for(&key.clone()));

    let mut bumped = key.clone();
    bumped.algorithm_version = "1.4".into();
    assert!(!key.is_valid_for(&bumped));

    let mut other_data = key.clone();
    other_data.dataset_version = "2".into();
    assert!(!key.is_valid_for(&other_data));

    let mut other_system = key.clone();
    other_system.system_version = "0".into();
    assert!(!key.is_valid_for(&other_system));
}

#[test]
fn test_cache_key_fingerprint_is_stable_and_distinct() {
    let a = CacheKey::new("d", "1", "ans", "1");
    assert_eq!(a.fingerprint(), CacheKey::new("d", "1", "ans", "1").fingerprint());
    // component boundaries matter
    let b = CacheKey::new("d1", "", "ans", "1");
    assert_ne!(a.fingerprint(), b.fingerprint());
    assert!(a.stem().starts_with("d-ans-"));
}

// ── compatibility ──────────────────────────────────────────────────────────

#[test]
fn test_predictive_tags_need_correlated_integer_timeseries() {
    let ephys = ["correlated", "timeseries", "integer"];
    assert!(is_compatible(&[DELTA_ENCODING], &ephys));
    assert!(is_compatible(&[LPC_PREDICTION], &ephys));
    assert!(!is_compatible(&[LPC_PREDICTION], &["timeseries", "integer"]));
    assert!(!is_compatible(&[DELTA_ENCODING], &["correlated", "timeseries"]));
}

#[test]
fn test_shape_and_sparsity_tags() {
    assert!(!is_compatible(&[REQUIRES_1D], &["integer"]));
    assert!(is_compatible(&[REQUIRES_1D], &["1d"]));
    assert!(!is_compatible(&[ZERO_RLE], &["sparse", "timeseries"]));
    assert!(is_compatible(&[ZERO_RLE], &["sparse", "timeseries", "1d"]));
    assert!(!is_compatible(&["integer"], &["float"]));
}

// ── metrics ────────────────────────────────────────────────────────────────

fn signal(rows: &[Vec<i16>]) -> AnySignal {
    Signal::from_rows(rows).unwrap().into()
}

#[test]
fn test_verify_lossless_reports_first_mismatch() {
    let a = signal(&[vec![1, 2], vec![3, 4]]);
    assert!(verify_lossless(&a, &a.clone()).is_ok());

    let b = signal(&[vec![1, 2], vec![3, 5]]);
    assert!(matches!(
        verify_lossless(&a, &b),
        Err(Error::LosslessMismatch { index: 3 })
    ));

    let c = signal(&[vec![1, 2, 3, 4]]);
    assert!(matches!(verify_lossless(&a, &c), Err(Error::ShapeMismatch { .. })));

    let d: AnySignal = Signal::<i32>::from_rows(&[vec![1, 2], vec![3, 4]]).unwrap().into();
    assert!(matches!(verify_lossless(&a, &d), Err(Error::DtypeMismatch { .. })));
}

#[test]
fn test_loss_metrics() {
    let a = signal(&[vec![0, 0], vec![0, 0]]);
    let b = signal(&[vec![1, -1], vec![3, 1]]);
    let m = loss_metrics(&a, &b).unwrap();
    assert_eq!(m.max_abs_error, 3);
    assert!((m.rmse - (12.0f64 / 4.0).sqrt()).abs() < 1e-12);

    let exact = loss_metrics(&a, &a).unwrap();
    assert_eq!(exact.rmse, 0.0);
    assert_eq!(exact.max_abs_error, 0);
}
