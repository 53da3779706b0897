mod common;

mod tests {
    use myrtio_phase_control::{Device, DeviceHandle, Error, SchedulerConfig};

    use super::common::{RelControl, RelScheduler};

    const SEMI: u16 = 10_000;

    fn ordered<const N: usize>(control: &RelControl<'_, N>) -> Vec<u16> {
        control.inspect(|table| table.iter().map(Device::delay).collect())
    }

    fn assert_ordered<const N: usize>(control: &RelControl<'_, N>) {
        control.inspect(|table| {
            let devices: Vec<Device> = table.iter().copied().collect();
            for (index, device) in devices.iter().enumerate() {
                assert_eq!(device.position(), index);
            }
            for pair in devices.windows(2) {
                assert!(pair[0].delay() <= pair[1].delay());
            }
        });
    }

    #[test]
    fn test_new_devices_are_off() {
        let scheduler = RelScheduler::<4>::new(SchedulerConfig::mains_50hz());
        let mut control = scheduler.control().unwrap();
        let a = control.create(1).unwrap();
        let b = control.create(2).unwrap();

        assert_eq!(control.delay(&a), SEMI);
        assert_eq!(control.delay(&b), SEMI);
        assert_eq!(control.device_count(), 2);
        assert!(control.all_binary());
        assert_ordered(&control);
    }

    #[test]
    fn test_order_follows_delay_changes() {
        let scheduler = RelScheduler::<4>::new(SchedulerConfig::mains_50hz());
        let mut control = scheduler.control().unwrap();
        let handles: Vec<DeviceHandle> = (0..4).map(|pin| control.create(pin).unwrap()).collect();

        control.set_delay(&handles[0], 7_000);
        control.set_delay(&handles[1], 2_000);
        control.set_delay(&handles[2], 5_000);
        control.set_delay(&handles[3], 1_000);
        assert_eq!(ordered(&control), vec![1_000, 2_000, 5_000, 7_000]);
        assert_ordered(&control);

        // Move the first device to the back, then the last to the front.
        control.set_delay(&handles[3], 9_000);
        assert_eq!(ordered(&control), vec![2_000, 5_000, 7_000, 9_000]);
        assert_ordered(&control);

        control.set_delay(&handles[3], 0);
        assert_eq!(ordered(&control), vec![0, 2_000, 5_000, 7_000]);
        assert_ordered(&control);
        assert_eq!(
            control.inspect(|table| table.get(&handles[3]).map(Device::position)),
            Some(0)
        );
    }

    #[test]
    fn test_order_holds_for_pseudo_random_sequence() {
        let scheduler = RelScheduler::<8>::new(SchedulerConfig::mains_50hz());
        let mut control = scheduler.control().unwrap();
        let handles: Vec<DeviceHandle> = (0..8).map(|pin| control.create(pin).unwrap()).collect();

        let mut seed: u32 = 0x1234_5678;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let index = (seed >> 24) as usize % handles.len();
            let delay = (seed >> 8) as u16 % (SEMI + 1);
            control.set_delay(&handles[index], delay);
            assert_eq!(control.delay(&handles[index]), delay);
            assert_ordered(&control);
        }
    }

    #[test]
    fn test_set_delay_is_idempotent() {
        let scheduler = RelScheduler::<4>::new(SchedulerConfig::mains_50hz());
        let mut control = scheduler.control().unwrap();
        let a = control.create(1).unwrap();
        let b = control.create(2).unwrap();
        control.set_delay(&a, 3_000);
        control.set_delay(&b, 3_000);

        let before: Vec<(u8, u16, usize)> = control.inspect(|table| {
            table
                .iter()
                .map(|d| (d.pin(), d.delay(), d.position()))
                .collect()
        });
        control.set_delay(&a, 3_000);
        let after: Vec<(u8, u16, usize)> = control.inspect(|table| {
            table
                .iter()
                .map(|d| (d.pin(), d.delay(), d.position()))
                .collect()
        });
        assert_eq!(before, after);
    }

    #[test]
    fn test_delay_clamped_to_semi_period() {
        let scheduler = RelScheduler::<2>::new(SchedulerConfig::mains_50hz());
        let mut control = scheduler.control().unwrap();
        let a = control.create(1).unwrap();

        control.set_delay(&a, 4_321);
        assert_eq!(control.delay(&a), 4_321);
        control.set_delay(&a, 12_000);
        assert_eq!(control.delay(&a), SEMI);
        control.set_delay(&a, u16::MAX);
        assert_eq!(control.delay(&a), SEMI);
    }

    #[test]
    fn test_binary_detection() {
        let scheduler = RelScheduler::<4>::new(SchedulerConfig::mains_50hz());
        let mut control = scheduler.control().unwrap();
        let a = control.create(1).unwrap();
        let b = control.create(2).unwrap();
        let c = control.create(3).unwrap();

        control.turn_on(&a);
        control.turn_off(&b);
        control.turn_on(&c);
        assert!(control.all_binary());

        control.set_delay(&b, 5_000);
        assert!(!control.all_binary());

        control.turn_off(&b);
        assert!(control.all_binary());
        assert_eq!(control.delay(&a), 0);
        assert_eq!(control.delay(&b), SEMI);
    }

    #[test]
    fn test_capacity_exceeded() {
        let scheduler = RelScheduler::<2>::new(SchedulerConfig::mains_50hz());
        let mut control = scheduler.control().unwrap();
        control.create(1).unwrap();
        control.create(2).unwrap();

        assert_eq!(control.create(3), Err(Error::CapacityExceeded));
        assert_eq!(control.device_count(), 2);
    }

    #[test]
    fn test_remove_compacts_and_frees_slot() {
        let scheduler = RelScheduler::<3>::new(SchedulerConfig::mains_50hz());
        let mut control = scheduler.control().unwrap();
        let a = control.create(1).unwrap();
        let b = control.create(2).unwrap();
        let c = control.create(3).unwrap();
        control.set_delay(&a, 1_000);
        control.set_delay(&b, 2_000);
        control.set_delay(&c, 3_000);

        control.remove(b);
        assert_eq!(control.device_count(), 2);
        assert_eq!(ordered(&control), vec![1_000, 3_000]);
        assert_ordered(&control);
        assert_eq!(
            control.inspect(|table| table.get(&c).map(Device::position)),
            Some(1)
        );

        // The freed slot is reused.
        let d = control.create(4).unwrap();
        assert_eq!(control.device_count(), 3);
        assert_eq!(control.delay(&d), SEMI);
        assert_ordered(&control);
    }

    #[test]
    fn test_foreign_handle_is_ignored() {
        let wide = RelScheduler::<8>::new(SchedulerConfig::mains_50hz());
        let mut wide_control = wide.control().unwrap();
        let handles: Vec<DeviceHandle> = (0..6)
            .map(|pin| wide_control.create(pin).unwrap())
            .collect();

        let narrow = RelScheduler::<2>::new(SchedulerConfig::mains_50hz());
        let mut control = narrow.control().unwrap();
        let own = control.create(9).unwrap();
        control.set_delay(&own, 1_000);

        let foreign = handles.into_iter().last().unwrap();
        control.set_delay(&foreign, 2_000);
        assert_eq!(control.delay(&foreign), SEMI);
        control.remove(foreign);
        assert_eq!(control.device_count(), 1);
        assert_eq!(control.delay(&own), 1_000);
    }

    #[test]
    fn test_remove_restores_binary_state() {
        let scheduler = RelScheduler::<3>::new(SchedulerConfig::mains_50hz());
        let mut control = scheduler.control().unwrap();
        let a = control.create(1).unwrap();
        let b = control.create(2).unwrap();
        control.turn_on(&a);
        control.set_delay(&b, 5_000);
        assert!(!control.all_binary());

        control.remove(b);
        assert!(control.all_binary());
    }

    #[test]
    fn test_equal_delays_keep_insertion_order() {
        let scheduler = RelScheduler::<3>::new(SchedulerConfig::mains_50hz());
        let mut control = scheduler.control().unwrap();
        control.create(7).unwrap();
        control.create(8).unwrap();
        control.create(9).unwrap();

        let pins: Vec<u8> = control.inspect(|table| table.iter().map(Device::pin).collect());
        assert_eq!(pins, vec![7, 8, 9]);
    }

    #[test]
    fn test_control_taken_once() {
        let scheduler = RelScheduler::<1>::new(SchedulerConfig::mains_50hz());
        let _control = scheduler.control().unwrap();
        assert!(matches!(scheduler.control(), Err(Error::ControlTaken)));
    }
}
