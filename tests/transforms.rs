//! Round-trip and scenario checks of the pixel ↔ sky transforms

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;

use wcscore::framelib::{convert, CoordSys, SkyFrame};
use wcscore::projection::plate;
use wcscore::{distance, HeaderMap, PointStatus, Projection, WcsContext};

fn tangent_header(naxis: usize, crval: (f64, f64), cdelt: f64, rotation: f64) -> HeaderMap {
    HeaderMap::new()
        .with("NAXIS", 2)
        .with("NAXIS1", naxis)
        .with("NAXIS2", naxis)
        .with("CTYPE1", "RA---TAN")
        .with("CTYPE2", "DEC--TAN")
        .with("CRPIX1", naxis as f64 / 2.0 + 0.5)
        .with("CRPIX2", naxis as f64 / 2.0 + 0.5)
        .with("CRVAL1", crval.0)
        .with("CRVAL2", crval.1)
        .with("CDELT1", -cdelt)
        .with("CDELT2", cdelt)
        .with("CROTA2", rotation)
        .with("EQUINOX", 2000.0)
}

fn assert_pixel_roundtrip(wcs: &WcsContext, samples: usize, seed: u64, tolerance: f64) {
    let (nx, ny) = wcs.image_size();
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..samples {
        let x = rng.gen_range(1.0..nx as f64);
        let y = rng.gen_range(1.0..ny as f64);
        let sky = wcs.pixel_to_sky(x, y);
        assert_eq!(sky.status, PointStatus::Ok);
        let pix = wcs.sky_to_pixel(sky.lon, sky.lat);
        assert_eq!(pix.status, PointStatus::Ok, "({}, {})", x, y);
        assert!(!pix.offscale);
        assert!((pix.x - x).abs() < tolerance, "x {} -> {}", x, pix.x);
        assert!((pix.y - y).abs() < tolerance, "y {} -> {}", y, pix.y);
    }
}

#[rstest]
#[case((83.633, 22.0145), 0.0)]
#[case((0.2, -45.0), 33.0)]
#[case((359.9, 89.5), -120.0)]
#[case((210.0, -89.0), 5.0)]
fn test_tangent_roundtrip(#[case] crval: (f64, f64), #[case] rotation: f64) {
    let wcs = WcsContext::from_header(&tangent_header(1024, crval, 2.0 / 3600.0, rotation)).unwrap();
    assert_pixel_roundtrip(&wcs, 200, 42, 1e-6);
}

#[rstest]
#[case("-SIN")]
#[case("-ARC")]
#[case("-STG")]
#[case("-CAR")]
#[case("-NCP")]
#[case("-GLS")]
#[case("-MER")]
#[case("-AIT")]
fn test_classic_projection_roundtrip(#[case] suffix: &str) {
    let header = tangent_header(512, (150.0, 35.0), 0.01, 10.0)
        .with("CTYPE1", format!("RA--{}", suffix))
        .with("CTYPE2", format!("DEC-{}", suffix));
    let wcs = WcsContext::from_header(&header).unwrap();
    assert_pixel_roundtrip(&wcs, 100, 7, 1e-6);
}

#[test]
fn test_roundtrip_in_other_output_frames() {
    let mut wcs = WcsContext::from_header(&tangent_header(1024, (266.4, -28.9), 1.0 / 3600.0, 0.0)).unwrap();
    for frame in [SkyFrame::fk4(), SkyFrame::galactic(), SkyFrame::ecliptic(2000.0)] {
        wcs.set_output_frame(frame);
        assert_pixel_roundtrip(&wcs, 50, 3, 1e-5);
    }
}

#[test]
fn test_cd_matrix_scenario() {
    let header = HeaderMap::new()
        .with("NAXIS1", 512)
        .with("NAXIS2", 512)
        .with("CTYPE1", "RA---TAN")
        .with("CTYPE2", "DEC--TAN")
        .with("CRPIX1", 256)
        .with("CRPIX2", 256)
        .with("CRVAL1", 180.0)
        .with("CRVAL2", 30.0)
        .with("CD1_1", -0.0002777)
        .with("CD2_2", 0.0002777);
    let wcs = WcsContext::from_header(&header).unwrap();

    assert!(wcs.rotation().abs() < 1e-12);
    assert_relative_eq!(wcs.cdelt().0, -0.0002777, max_relative = 1e-12);
    let pos = wcs.pixel_to_sky(256.0, 256.0);
    assert_relative_eq!(pos.lon, 180.0, epsilon = 1e-10);
    assert_relative_eq!(pos.lat, 30.0, epsilon = 1e-10);
}

#[test]
fn test_offscale_boundary() {
    let wcs = WcsContext::from_header(&tangent_header(100, (10.0, 10.0), 1.0 / 3600.0, 0.0)).unwrap();

    let inside = wcs.pixel_to_sky(0.5, 50.0);
    let pix = wcs.sky_to_pixel(inside.lon, inside.lat);
    assert!(!pix.offscale, "{:?}", pix);

    let outside = wcs.pixel_to_sky(0.4, 50.0);
    let pix = wcs.sky_to_pixel(outside.lon, outside.lat);
    assert!(pix.offscale, "{:?}", pix);
    assert_eq!(pix.status, PointStatus::Ok);

    // Off-image pixels still transform; only the projection marks them
    assert!(!outside.offscale());
}

#[test]
fn test_galactic_centre() {
    let (l, b) = convert(266.405, -28.936, &SkyFrame::fk5(), &SkyFrame::galactic(), 2000.0);
    assert!(distance(l, b, 0.0, 0.0) < 0.1, "({}, {})", l, b);
}

#[test]
fn test_fk4_fk5_idempotence() {
    let mut rng = StdRng::seed_from_u64(1950);
    for _ in 0..200 {
        let ra = rng.gen_range(0.0..360.0);
        let dec = rng.gen_range(-89.0..89.0);
        let (ra5, dec5) = convert(ra, dec, &SkyFrame::fk4(), &SkyFrame::fk5(), 1950.0);
        let (ra4, dec4) = convert(ra5, dec5, &SkyFrame::fk5(), &SkyFrame::fk4(), 1950.0);
        assert!(distance(ra, dec, ra4, dec4) < 1e-6, "({}, {}) -> ({}, {})", ra, dec, ra4, dec4);
    }
}

#[test]
fn test_distance_properties() {
    assert_relative_eq!(distance(0.0, 0.0, 90.0, 0.0), 90.0, epsilon = 1e-9);
    assert_eq!(distance(123.4, -56.7, 123.4, -56.7), 0.0);
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..100 {
        let a = (rng.gen_range(0.0..360.0), rng.gen_range(-90.0..90.0));
        let b = (rng.gen_range(0.0..360.0), rng.gen_range(-90.0..90.0));
        assert_eq!(distance(a.0, a.1, b.0, b.1), distance(b.0, b.1, a.0, a.1));
    }
}

fn plate_header(x_coeff: &[f64], y_coeff: &[f64]) -> HeaderMap {
    let mut header = HeaderMap::new()
        .with("NAXIS1", 1000)
        .with("NAXIS2", 1000)
        .with("CTYPE1", "RA---PLT")
        .with("CTYPE2", "DEC--PLT")
        .with("CRPIX1", 500.5)
        .with("CRPIX2", 500.5)
        .with("CRVAL1", 45.0)
        .with("CRVAL2", 60.0)
        .with("EQUINOX", 2000.0);
    for (i, c) in x_coeff.iter().enumerate() {
        header.set(&format!("CO1_{}", i + 1), c);
    }
    for (i, c) in y_coeff.iter().enumerate() {
        header.set(&format!("CO2_{}", i + 1), c);
    }
    header
}

#[test]
fn test_identity_plate() {
    let header = plate_header(&[0.0, 1.0, 0.0, 0.0, 0.0, 0.0], &[0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
    let wcs = WcsContext::from_header(&header).unwrap();
    let plate = match wcs.projection() {
        Projection::Plate(plate) => *plate,
        other => panic!("expected plate, got {:?}", other),
    };

    let (dx, dy) = (0.25, -0.5);
    let (xi, eta) = wcs.pixel_to_intermediate(500.5 + dx, 500.5 + dy);
    assert_eq!((xi, eta), (dx, dy));

    let sol = plate.standard_to_offset(xi, eta).unwrap();
    assert_eq!(sol.iterations, 1);
}

#[test]
fn test_distorted_plate_roundtrip() {
    let s = 1.0 / 3600.0;
    let x_coeff = [
        1e-4, -s, 2e-3 * s, 1e-8, -2e-8, 5e-9, 1e-11, -1e-11, 2e-12, 1e-12, 3e-9, 1e-13, 0.0,
    ];
    let y_coeff = [
        -2e-4, 1e-3 * s, s, -1e-8, 3e-8, 1e-9, 0.0, 2e-11, 1e-12, -1e-12, 2e-9, 0.0, 1e-13,
    ];
    let wcs = WcsContext::from_header(&plate_header(&x_coeff, &y_coeff)).unwrap();
    assert_pixel_roundtrip(&wcs, 200, 11, 1e-4);
}

#[test]
fn test_plate_without_real_inverse_reports_nonconvergence() {
    // xi = 1e-4 x + 1e-5 x² never goes below -2.5e-4 degrees
    let header = plate_header(&[0.0, 1e-4, 0.0, 1e-5], &[0.0, 0.0, 1e-4]);
    let wcs = WcsContext::from_header(&header).unwrap();
    let (lon, lat) = plate::standard_to_sky(-1e-3, 2e-4, 45.0, 60.0);

    let pix = wcs.sky_to_pixel(lon, lat);
    assert_eq!(pix.status, PointStatus::NotConverged { iterations: 50 });
    assert!(pix.offscale);
    assert!(pix.x.is_nan() && pix.y.is_nan());

    let reachable = wcs.pixel_to_sky(510.5, 520.5);
    let pix = wcs.sky_to_pixel(reachable.lon, reachable.lat);
    assert_eq!(pix.status, PointStatus::Ok);
    assert!((pix.x - 510.5).abs() < 1e-4 && (pix.y - 520.5).abs() < 1e-4);
}

#[test]
fn test_plate_without_linear_terms_reports_singular_jacobian() {
    let header = plate_header(&[0.0, 0.0, 0.0, 1e-6], &[0.0, 0.0, 0.0, 0.0, 1e-6]);
    let wcs = WcsContext::from_header(&header).unwrap();
    let (lon, lat) = plate::standard_to_sky(4e-4, 9e-4, 45.0, 60.0);

    let pix = wcs.sky_to_pixel(lon, lat);
    assert_eq!(pix.status, PointStatus::SingularJacobian);
    assert!(pix.offscale);
    assert!(pix.x.is_nan() && pix.y.is_nan());
}

#[test]
fn test_dss_roundtrip() {
    let header = HeaderMap::new()
        .with("NAXIS1", 400)
        .with("NAXIS2", 400)
        .with("PLTRAH", 12)
        .with("PLTRAM", 30)
        .with("PLTRAS", 0.0)
        .with("PLTDECSN", "+")
        .with("PLTDECD", 45)
        .with("PLTDECM", 0)
        .with("PLTDECS", 0.0)
        .with("PLTSCALE", 67.2)
        .with("XPIXELSZ", 25.284_45)
        .with("YPIXELSZ", 25.284_45)
        .with("CNPIX1", 3000)
        .with("CNPIX2", 9000)
        .with("PPO3", 7000.0 * 25.284_45)
        .with("PPO6", 7000.0 * 25.284_45)
        .with("AMDX1", 67.19)
        .with("AMDX2", 0.01)
        .with("AMDX3", -3.2)
        .with("AMDX4", 2e-5)
        .with("AMDX7", 1e-5)
        .with("AMDX12", 3e-7)
        .with("AMDY1", 67.21)
        .with("AMDY2", -0.02)
        .with("AMDY3", 4.1)
        .with("AMDY5", -3e-5)
        .with("AMDY7", 1e-5)
        .with("AMDY12", -2e-7);
    let wcs = WcsContext::from_header(&header).unwrap();
    assert_eq!(wcs.native_frame().system, CoordSys::Fk5);
    assert_pixel_roundtrip(&wcs, 200, 17, 1e-4);
}

#[test]
fn test_sip_roundtrip_without_inverse() {
    let header = tangent_header(2048, (201.0, -43.0), 1.0 / 3600.0, 12.0)
        .with("CTYPE1", "RA---TAN-SIP")
        .with("CTYPE2", "DEC--TAN-SIP")
        .with("A_ORDER", 3)
        .with("A_2_0", 2e-6)
        .with("A_1_1", -1e-6)
        .with("A_3_0", 1e-10)
        .with("B_ORDER", 3)
        .with("B_0_2", 3e-6)
        .with("B_2_1", -2e-10);
    let wcs = WcsContext::from_header(&header).unwrap();
    assert_pixel_roundtrip(&wcs, 200, 23, 1e-6);
}

#[test]
fn test_string_output_off_map() {
    let header = tangent_header(100, (10.0, 0.0), 1.0, 0.0)
        .with("CTYPE1", "RA---SIN")
        .with("CTYPE2", "DEC--SIN");
    let wcs = WcsContext::from_header(&header).unwrap();
    // 100 degrees from the reference point is beyond the SIN hemisphere
    assert_eq!(wcs.pixel_to_sky_string(50.5, 150.5), "Off map");
    assert_eq!(wcs.pixel_to_sky(50.5, 150.5).status, PointStatus::AngleTooLarge);
    assert_ne!(wcs.pixel_to_sky_string(50.5, 60.5), "Off map");
}
