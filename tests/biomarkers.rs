use approx::assert_relative_eq;
use voicemarkers::cluster::{cloud_from_pairs, ClusterSettings};
use voicemarkers::engine::{FormantContour, FormantFrame};
use voicemarkers::features::dispersion::{aavs, hull_area};
use voicemarkers::features::lexical::{count_syllables, mattr, tokenize};
use voicemarkers::features::timing::average_pause_duration;
use voicemarkers::features::vai::vowel_articulation_index;
use voicemarkers::features::{DensityFilter, FormantSample, FormantTrajectory};
use voicemarkers::transcription::PhoneInterval;
use voicemarkers::AnalysisError;

/// Four 100 ms blocks of constant (F1, F2), one per entry.
fn blocks(values: &[(f64, f64)]) -> FormantContour {
    let frames: Vec<FormantFrame> = values
        .iter()
        .flat_map(|&(f1, f2)| std::iter::repeat(vec![f1, f2]).take(10))
        .enumerate()
        .map(|(i, frequencies)| FormantFrame {
            time: 0.005 + i as f64 * 0.01,
            frequencies,
        })
        .collect();
    FormantContour {
        start_time: 0.0,
        end_time: frames.len() as f64 * 0.01,
        time_step: 0.01,
        frames,
    }
}

fn phone(label: &str, block: usize) -> PhoneInterval {
    PhoneInterval {
        label: label.to_string(),
        start: block as f64 * 0.1 + 0.02,
        end: block as f64 * 0.1 + 0.08,
    }
}

#[test]
fn vai_matches_closed_form() {
    let contour = blocks(&[(300.0, 2500.0), (300.0, 800.0), (700.0, 1700.0), (700.0, 1200.0)]);
    let phones = vec![phone("i", 0), phone("u", 1), phone("æ", 2), phone("ɑ", 3)];
    let vai = vowel_articulation_index(&contour, &phones, 5).unwrap();
    assert_relative_eq!(vai, (2500.0 - 700.0) / (800.0 + 1200.0 + 300.0 + 300.0), epsilon = 1e-9);
}

#[test]
fn vai_is_undefined_without_every_corner_vowel() {
    let contour = blocks(&[(300.0, 2500.0), (300.0, 800.0), (700.0, 1700.0), (700.0, 1200.0)]);
    let phones = vec![phone("i", 0), phone("u", 1), phone("ɑ", 3)];
    let err = vowel_articulation_index(&contour, &phones, 5).unwrap_err();
    assert!(err.is_metric_local());
}

#[test]
fn hull_of_unit_square_centroids() {
    let square = cloud_from_pairs(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
    let settings = ClusterSettings {
        cluster_count: 4,
        ..ClusterSettings::default()
    };
    assert_relative_eq!(hull_area(square.view(), &settings).unwrap(), 1.0, epsilon = 1e-12);
}

#[test]
fn hull_needs_as_many_points_as_clusters() {
    let triangle = cloud_from_pairs(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
    let err = hull_area(triangle.view(), &ClusterSettings::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::InsufficientData { .. }));
}

#[test]
fn aavs_on_a_line_is_never_positive() {
    let pairs: Vec<[f64; 2]> = (0..20).map(|i| [i as f64, 2.0 * i as f64 + 1.0]).collect();
    match aavs(cloud_from_pairs(&pairs).view()) {
        Err(AnalysisError::SingularCovariance(_)) => {}
        Ok(value) => assert_eq!(value, 0.0),
        Err(other) => panic!("unexpected error {other}"),
    }
}

#[test]
fn density_filter_returns_a_joined_subset() {
    let samples: Vec<FormantSample> = (0..80)
        .map(|i| {
            let wobble = ((i * 37) % 11) as f64 * 7.0;
            let sway = ((i * 53) % 7) as f64 * 15.0;
            let (f1, f2) = if i % 2 == 0 { (350.0, 2200.0) } else { (650.0, 1200.0) };
            FormantSample {
                time: i as f64 * 0.01,
                f1: f1 + wobble,
                f2: f2 - sway,
            }
        })
        .collect();
    let trajectory = FormantTrajectory::from_hz(samples);
    let settings = ClusterSettings {
        cluster_count: 2,
        ..ClusterSettings::default()
    };
    let filtered = DensityFilter::new(settings).filter(&trajectory).unwrap();

    assert!(filtered.len() <= trajectory.len());
    for (hz, bark) in filtered.hz().iter().zip(filtered.bark()) {
        assert_eq!(hz.time, bark.time);
        assert!(trajectory.hz().contains(hz));
    }
}

#[test]
fn mattr_window_edges() {
    let short = tokenize("one two three");
    assert!(mattr(&short, 8).is_err());
    let distinct = tokenize("alpha beta gamma delta epsilon zeta eta theta");
    assert_relative_eq!(mattr(&distinct, distinct.len()).unwrap(), 1.0);
}

#[test]
fn syllable_heuristic_floors_at_one() {
    assert_eq!(count_syllables("the"), 1);
    assert_eq!(count_syllables("silence"), 2);
    for word in tokenize("a rhythm of psst and strengths") {
        assert!(count_syllables(&word) >= 1);
    }
}

#[test]
fn long_gaps_are_excluded_from_pause_average() {
    let mut pauses = vec![0.1; 19];
    pauses.push(1.0);
    assert_relative_eq!(average_pause_duration(&pauses, 3.0), 0.1, epsilon = 1e-12);
    assert_relative_eq!(average_pause_duration(&[0.1, 0.3], 3.0), 0.2, epsilon = 1e-12);
    assert_eq!(average_pause_duration(&[], 3.0), 0.0);
}
