use biquad_engine::{BiquadFilter, Realization};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn stage(i: usize) -> [f64; 5] {
    let r = 0.4 + 0.025 * i as f64;
    let theta = 0.2 + 0.15 * i as f64;
    [0.6, 0.1, -0.05 * i as f64, -2.0 * r * theta.cos(), r * r]
}

// Feeds `input` through one single-channel filter per stage, one after another.
fn sequential(realization: Realization, stages: usize, input: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut buf = input.to_vec();
    let mut delays = Vec::new();
    for i in 0..stages {
        let mut f = BiquadFilter::builder(1)
            .coefficients(&stage(i))
            .realization(realization)
            .optimized(false)
            .build();
        let mut out = vec![0.0; buf.len()];
        f.process(&mut out, &buf, buf.len());
        buf = out;
        delays.extend_from_slice(f.delays());
    }
    (buf, delays)
}

fn cascade(realization: Realization, stages: usize) -> BiquadFilter<f64> {
    let mut f = BiquadFilter::builder(stages)
        .per_channel()
        .realization(realization)
        .build();
    for i in 0..stages {
        f.set_channel_coefficients(i, &stage(i), true);
    }
    f
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= 1e-10 * (1.0 + e.abs()),
            "sample {}: {} vs {}",
            i,
            a,
            e
        );
    }
}

#[test]
fn matches_sequential_filters() {
    let mut rng = StdRng::seed_from_u64(10);
    for &realization in &[Realization::DirectForm2Transposed, Realization::StateSpace] {
        for stages in 1..=20 {
            // Lengths on both sides of the short-input fallback for each group width.
            for &len in &[1usize, 5, 8, 9, 16, 17, 31, 32, 33, 64, 500] {
                let input: Vec<f64> = (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect();
                let (expected, expected_delays) = sequential(realization, stages, &input);

                let mut f = cascade(realization, stages);
                let mut buf = input.clone();
                f.process_1d(&mut buf, len);
                assert_close(&buf, &expected);
                assert_close(f.delays(), &expected_delays);
            }
        }
    }
}

#[test]
fn state_carries_across_calls() {
    let mut rng = StdRng::seed_from_u64(11);
    let input: Vec<f64> = (0..300).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let stages = 11;

    let mut whole = cascade(Realization::StateSpace, stages);
    let mut expected = input.clone();
    whole.process_1d(&mut expected, 300);

    let mut pieces = cascade(Realization::StateSpace, stages);
    let mut actual = input.clone();
    let (head, tail) = actual.split_at_mut(120);
    pieces.process_1d(head, 120);
    pieces.process_1d(tail, 180);

    assert_close(&actual, &expected);
    assert_close(pieces.delays(), whole.delays());
}

#[test]
fn only_the_requested_frames_change() {
    let mut f = cascade(Realization::DirectForm2Transposed, 4);
    let mut buf = vec![1.0; 40];
    f.process_1d(&mut buf, 30);
    assert!(buf[30..].iter().all(|&x| x == 1.0));
}

#[test]
fn shared_section_is_repeated() {
    let mut rng = StdRng::seed_from_u64(12);
    let input: Vec<f64> = (0..100).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let coefs = stage(3);

    let mut twice = BiquadFilter::with_coefficients(5, &coefs, true);
    let mut actual = input.clone();
    twice.process_1d(&mut actual, 100);

    let mut single = BiquadFilter::with_coefficients(1, &coefs, true);
    let mut expected = input;
    for _ in 0..5 {
        single.clear();
        single.process_in_place(&mut expected, 100, 1);
    }
    assert_close(&actual, &expected);
}

#[test]
fn zero_numerator_silences() {
    let mut f = BiquadFilter::<f32>::with_coefficients(3, &[0.0, 0.0, 0.0, 0.5, 0.0], false);
    f.set_delays(&[1.0; 6]);
    let mut buf = vec![1.0; 16];
    f.process_1d(&mut buf, 16);
    assert!(buf.iter().all(|&x| x == 0.0));
    assert_eq!(f.delays(), &[1.0; 6]);
}

#[test]
fn silent_stage_zeroes_its_output() {
    let mut rng = StdRng::seed_from_u64(13);
    let input: Vec<f64> = (0..200).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let silent = [0.0, 0.0, 0.0, -0.5, 0.1];
    for &realization in &[Realization::DirectForm2Transposed, Realization::StateSpace] {
        for &stages in &[3usize, 9, 17] {
            let quiet = stages / 2;
            let coefs = |i: usize| if i == quiet { silent } else { stage(i) };
            let initial: Vec<f64> = (0..2 * stages).map(|i| 0.05 * i as f64).collect();

            // The later stages only ring out from their initial state.
            let mut expected = input.clone();
            let mut expected_delays = Vec::new();
            for i in 0..stages {
                let mut f = BiquadFilter::builder(1)
                    .coefficients(&coefs(i))
                    .realization(realization)
                    .optimized(false)
                    .build();
                f.set_delays(&initial[2 * i..2 * i + 2]);
                f.process_in_place(&mut expected, 200, 1);
                expected_delays.extend_from_slice(f.delays());
            }

            let mut f = BiquadFilter::builder(stages)
                .per_channel()
                .realization(realization)
                .build();
            for i in 0..stages {
                f.set_channel_coefficients(i, &coefs(i), true);
            }
            f.set_delays(&initial);
            let mut actual = input.clone();
            f.process_1d(&mut actual, 200);

            assert_close(&actual, &expected);
            assert_close(f.delays(), &expected_delays);
            let state = 2 * quiet..2 * quiet + 2;
            assert_eq!(&f.delays()[state.clone()], &initial[state]);
        }
    }
}

#[test]
#[should_panic(expected = "buffer holds")]
fn short_buffer() {
    let mut f = BiquadFilter::<f32>::new(2);
    f.process_1d(&mut [0.0; 3], 4);
}
