use proptest::prelude::*;
use rpmlab_core::buffer::{Sample, SampleBuffer};
use rpmlab_core::counter::PulseCounter;
use rpmlab_core::estimator::RateEstimator;
use rpmlab_core::staircase::staircase_levels;
use rpmlab_core::util::{DUTY_FULL_SCALE, percent_to_u16};

proptest! {
    #[test]
    fn estimate_is_monotonic_in_pulses(
        ppr in 1u32..200,
        elapsed in 1u32..5_000,
        a in 0u32..10_000,
        b in 0u32..10_000,
    ) {
        let est = RateEstimator::new(ppr);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(est.estimate(lo, elapsed) <= est.estimate(hi, elapsed));
    }

    #[test]
    fn zero_pulses_is_zero_rpm(ppr in 1u32..200, elapsed in 0u32..100_000) {
        prop_assert_eq!(RateEstimator::new(ppr).estimate(0, elapsed), 0.0);
    }

    #[test]
    fn duty_round_trips_through_raw(p in 0u8..=100) {
        let raw = u32::from(percent_to_u16(p));
        let back = (raw * 100 + DUTY_FULL_SCALE / 2) / DUTY_FULL_SCALE;
        prop_assert_eq!(back, u32::from(p));
    }

    #[test]
    fn staircase_shape(k in 1i32..=100) {
        let levels = staircase_levels(k).unwrap();
        let step = k as u8;
        prop_assert_eq!(levels[0], 0);
        prop_assert_eq!(*levels.last().unwrap(), 0);
        prop_assert_ne!(levels[levels.len() - 2], 0);
        prop_assert!(levels.iter().all(|&l| l <= 100 && l % step == 0));
        let peak = levels.iter().position(|&l| l == *levels.iter().max().unwrap()).unwrap();
        prop_assert!(levels[..=peak].windows(2).all(|w| w[1] == w[0] + step));
        prop_assert!(levels[peak..].windows(2).all(|w| w[0] == w[1] + step));
    }

    #[test]
    fn staircase_rejects_out_of_range(k in prop_oneof![i32::MIN..1, 101..i32::MAX]) {
        prop_assert!(staircase_levels(k).is_err());
    }

    #[test]
    fn buffer_never_exceeds_capacity(cap in 1usize..64, pushes in 0usize..200) {
        let mut buf = SampleBuffer::with_capacity(cap);
        for i in 0..pushes {
            let _ = buf.push(Sample { timestamp_ms: i as u32, duty_percent: 0, rpm: 0.0 });
        }
        prop_assert_eq!(buf.len(), pushes.min(cap));
        prop_assert_eq!(buf.dropped(), pushes.saturating_sub(cap));
        // Oldest samples are the ones kept.
        prop_assert!(buf.iter().enumerate().all(|(i, s)| s.timestamp_ms == i as u32));
    }

    #[test]
    fn deltas_account_for_every_edge(bursts in proptest::collection::vec(0u32..500, 1..20)) {
        let mut counter = PulseCounter::new();
        let edge = counter.edge_handle();
        let mut taken = 0u64;
        for n in &bursts {
            for _ in 0..*n {
                edge.on_edge();
            }
            let d = counter.take_delta();
            prop_assert_eq!(d, *n);
            taken += u64::from(d);
        }
        prop_assert_eq!(taken, bursts.iter().map(|&n| u64::from(n)).sum::<u64>());
        prop_assert_eq!(counter.take_delta(), 0);
    }
}
