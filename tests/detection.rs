use ata_driver::drivers::ata::sim::{SimDisk, SimulatedBus};
use ata_driver::drivers::ata::{detect, AtaError, DeviceClass, Slot, Unit};
use ata_driver::AtaConfig;

const IDENTIFY: u8 = 0xEC;
const IDENTIFY_PACKET: u8 = 0xA1;

fn config() -> AtaConfig {
    AtaConfig::default().with_spin_limit(10_000)
}

fn probe(disk: SimDisk) -> (SimulatedBus, Result<DeviceClass, AtaError>) {
    let mut bus = SimulatedBus::new().with(Slot::PrimaryMaster, disk);
    let result = detect(&mut bus, Slot::PrimaryMaster.channel(), Unit::Master, &config());
    (bus, result.map(|device| device.class()))
}

fn put_string(words: &mut [u16], text: &str) {
    let mut bytes = [b' '; 80];
    bytes[..text.len()].copy_from_slice(text.as_bytes());
    for (i, word) in words.iter_mut().enumerate() {
        *word = u16::from_be_bytes([bytes[i * 2], bytes[i * 2 + 1]]);
    }
}

#[test]
fn every_signature_maps_to_its_class() {
    let cases = [
        (SimDisk::ata(), DeviceClass::Ata, IDENTIFY),
        (SimDisk::sata(), DeviceClass::Sata, IDENTIFY),
        (SimDisk::packet_ata(), DeviceClass::PacketAta, IDENTIFY_PACKET),
        (SimDisk::packet_sata(), DeviceClass::PacketSata, IDENTIFY_PACKET),
    ];
    for (disk, class, opcode) in cases {
        let (bus, result) = probe(disk);
        assert_eq!(result, Ok(class));
        assert_eq!(bus.commands(), [(0x1F0, opcode)]);
    }
}

#[test]
fn unknown_signature_issues_no_command() {
    let (bus, result) = probe(SimDisk::ata().with_signature(0x7F, 0x7F));
    assert_eq!(result, Err(AtaError::SignatureMismatch));
    assert!(bus.commands().is_empty());
}

#[test]
fn packet_device_needs_bit_14_or_15() {
    let (_, result) = probe(SimDisk::packet_ata().with_word0(0x0000));
    assert_eq!(result, Err(AtaError::ValidationMismatch));

    let (_, result) = probe(SimDisk::packet_sata().with_word0(0x4000));
    assert_eq!(result, Ok(DeviceClass::PacketSata));

    let (_, result) = probe(SimDisk::packet_ata().with_word0(0x8000));
    assert_eq!(result, Ok(DeviceClass::PacketAta));
}

#[test]
fn ata_device_with_bit_15_is_rejected() {
    let (_, result) = probe(SimDisk::ata().with_word0(0x8000));
    assert_eq!(result, Err(AtaError::ValidationMismatch));

    let (_, result) = probe(SimDisk::sata().with_word0(0x0000));
    assert_eq!(result, Ok(DeviceClass::Sata));
}

#[test]
fn empty_slot_is_absent() {
    let mut bus = SimulatedBus::new();
    let result = detect(&mut bus, Slot::SecondarySlave.channel(), Unit::Slave, &config());
    assert_eq!(result.map(|device| device.class()), Err(AtaError::AbsentDevice));
}

#[test]
fn identify_error_is_a_device_error() {
    let (_, result) = probe(SimDisk::ata().failing_identify());
    assert_eq!(result, Err(AtaError::DeviceError));

    let (_, result) = probe(SimDisk::packet_ata().failing_identify());
    assert_eq!(result, Err(AtaError::DeviceError));
}

#[test]
fn error_instead_of_identify_data_is_a_device_error() {
    let (bus, result) = probe(SimDisk::sata().failing_identify_data());
    assert_eq!(result, Err(AtaError::DeviceError));
    assert_eq!(bus.data_words_read(), 0);

    let (bus, result) = probe(SimDisk::packet_ata().failing_identify_data());
    assert_eq!(result, Err(AtaError::DeviceError));
    assert_eq!(bus.data_words_read(), 0);
}

#[test]
fn non_packet_signature_after_identify_is_rejected() {
    let (_, result) = probe(SimDisk::ata().with_post_identify_signature(0x14, 0xEB));
    assert_eq!(result, Err(AtaError::SignatureMismatch));
}

#[test]
fn packet_device_skips_post_identify_check() {
    let (_, result) = probe(SimDisk::packet_ata().with_post_identify_signature(0x14, 0xEB));
    assert_eq!(result, Ok(DeviceClass::PacketAta));
}

#[test]
fn busy_cycles_are_waited_out() {
    let (_, result) = probe(SimDisk::sata().with_busy_reads(500));
    assert_eq!(result, Ok(DeviceClass::Sata));
}

#[test]
fn device_that_never_drops_busy_times_out() {
    let (bus, result) = probe(SimDisk::ata().hanging());
    assert_eq!(result, Err(AtaError::Timeout));
    assert!(bus.commands().is_empty());
}

#[test]
fn not_ready_after_reset_still_identifies() {
    let (_, result) = probe(SimDisk::ata().not_ready_after_reset());
    assert_eq!(result, Ok(DeviceClass::Ata));
}

#[test]
fn slave_is_probed_independently_of_master() {
    let mut bus = SimulatedBus::new()
        .with(Slot::SecondaryMaster, SimDisk::ata())
        .with(Slot::SecondarySlave, SimDisk::packet_sata());
    let channel = Slot::SecondarySlave.channel();
    let device = detect(&mut bus, channel, Unit::Slave, &config()).expect("slave detected");
    assert_eq!(device.class(), DeviceClass::PacketSata);
    assert_eq!(device.unit(), Unit::Slave);
    assert_eq!(bus.commands(), [(0x170, IDENTIFY_PACKET)]);
}

#[test]
fn identity_fields_are_decoded() {
    let mut words = [0u16; 256];
    words[0] = 0x0040;
    put_string(&mut words[10..20], "SN-42");
    put_string(&mut words[23..27], "1.0");
    put_string(&mut words[27..47], "SIM DISK");
    words[60] = 0x1000;
    words[83] = 1 << 10;
    words[100] = 0x0000;
    words[101] = 0x0001;

    let mut bus = SimulatedBus::new().with(Slot::PrimaryMaster, SimDisk::ata().with_identity(words));
    let device = detect(&mut bus, Slot::PrimaryMaster.channel(), Unit::Master, &config()).expect("detected");
    assert_eq!(device.model(), "SIM DISK");
    assert!(device.supports_lba48());
    assert_eq!(device.lba28_sectors(), 0x1000);
    assert_eq!(device.sectors(), 0x1_0000);

    let info = device.info(Slot::PrimaryMaster.device_name());
    assert_eq!(info.name, "ATA-0");
    assert_eq!(info.serial, "SN-42");
    assert_eq!(info.firmware, "1.0");
    assert_eq!(info.capacity_bytes(), 0x1_0000 * 512);
}
