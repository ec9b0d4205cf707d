mod common;

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use crossbeam::channel::unbounded;
use gnss_relay::{
    nmea::{validate, InvalidSentence},
    DecoderOptions, NmeaDecoder, SerialConfig, SerialDevice, SerialIngestor,
};
use rand::Rng;
use test_case::test_case;

use common::nmea_line;

#[derive(Clone, Default)]
struct MemDevice {
    input: Arc<Mutex<VecDeque<u8>>>,
    output: Arc<Mutex<Vec<u8>>>,
}

impl MemDevice {
    fn feed(&self, dat: &[u8]) {
        self.input.lock().unwrap().extend(dat);
    }
}

impl SerialDevice for MemDevice {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.input.lock().unwrap().len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut input = self.input.lock().unwrap();
        let num = buf.len().min(input.len());
        for (dst, src) in buf.iter_mut().zip(input.drain(..num)) {
            *dst = src;
        }
        Ok(num)
    }

    fn write_all(&mut self, dat: &[u8]) -> io::Result<()> {
        self.output.lock().unwrap().extend_from_slice(dat);
        Ok(())
    }
}

fn serial_config() -> SerialConfig {
    SerialConfig::builder().port("mem").close_grace_ms(5).build()
}

/// Poll the decoder until `want` position updates have been seen or time runs out.
fn decode_updates(decoder: &mut NmeaDecoder, want: usize) -> usize {
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut updates = 0;
    while updates < want && Instant::now() < deadline {
        match decoder.read() {
            Some(line) => {
                if decoder.decode(&line) {
                    updates += 1;
                }
            }
            None => thread::sleep(Duration::from_millis(1)),
        }
    }
    updates
}

#[test_case("4807.038", "N", 48.1173; "north")]
#[test_case("4807.038", "S", -48.1173; "south")]
#[test_case("01131.000", "E", 11.516_666_666_666_667; "east")]
#[test_case("00630.3372", "W", -6.50562; "west")]
fn test_gga_hemispheres(value: &str, hemisphere: &str, expected: f64) {
    let (lat, lon) = if hemisphere == "N" || hemisphere == "S" {
        (format!("{value},{hemisphere}"), "00000.000,E".to_string())
    } else {
        ("0000.000,N".to_string(), format!("{value},{hemisphere}"))
    };
    let line = nmea_line(&format!("GPGGA,000000,{lat},{lon},1,05,1.0,10.0,M,0.0,M,,"));
    let (_tx, rx) = unbounded::<String>();
    let mut decoder = NmeaDecoder::new(rx, &DecoderOptions::default());

    assert!(decoder.decode(validate(&line).unwrap()));
    let got = if hemisphere == "N" || hemisphere == "S" {
        decoder.fix().lat
    } else {
        decoder.fix().lon
    };
    assert!((got - expected).abs() < 1e-9, "got {got}");
}

#[test]
fn test_random_gga_recovers_position() {
    let mut rng = rand::thread_rng();
    let (_tx, rx) = unbounded::<String>();
    let mut decoder = NmeaDecoder::new(rx, &DecoderOptions::default());

    for _ in 0..500 {
        let lat_deg: u32 = rng.gen_range(0..90);
        let lat_min = f64::from(rng.gen_range(0..600_000u32)) / 10_000.0;
        let lon_deg: u32 = rng.gen_range(0..180);
        let lon_min = f64::from(rng.gen_range(0..600_000u32)) / 10_000.0;
        let alt = f64::from(rng.gen_range(-50_000..900_000)) / 100.0;
        let ns = if rng.gen() { "N" } else { "S" };
        let ew = if rng.gen() { "E" } else { "W" };

        let lat_field = format!("{lat_deg:02}{lat_min:07.4}");
        let lon_field = format!("{lon_deg:03}{lon_min:07.4}");
        let line = nmea_line(&format!(
            "GNGGA,120000.00,{lat_field},{ns},{lon_field},{ew},4,12,0.7,{alt:.2},M,0.0,M,1.0,0000"
        ));

        let valid = validate(&line).unwrap();
        assert!(decoder.decode(valid), "{line}");

        let sign = |neg: bool| if neg { -1.0 } else { 1.0 };
        let lat_min: f64 = lat_field[2..].parse().unwrap();
        let lon_min: f64 = lon_field[3..].parse().unwrap();
        let lat = sign(ns == "S") * (f64::from(lat_deg) + lat_min / 60.0);
        let lon = sign(ew == "W") * (f64::from(lon_deg) + lon_min / 60.0);
        let want_alt: f64 = format!("{alt:.2}").parse().unwrap();

        let fix = decoder.fix();
        assert!((fix.lat - lat).abs() < 1e-12, "{line}: lat {} != {lat}", fix.lat);
        assert!((fix.lon - lon).abs() < 1e-12, "{line}: lon {} != {lon}", fix.lon);
        assert_eq!(fix.alt, want_alt, "{line}");
        assert_eq!(fix.quality_name(), "RTK fix");
    }
}

#[test]
fn test_corrupt_checksum_rejected() {
    let line = nmea_line("GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
    let corrupt = line.replace("4807", "4806");
    assert!(matches!(
        validate(&corrupt),
        Err(InvalidSentence::Checksum { .. })
    ));
}

#[test]
fn test_serial_to_fix() {
    let dev = MemDevice::default();
    let mut ingestor = SerialIngestor::from_device(dev.clone(), &serial_config());
    let mut decoder = NmeaDecoder::new(ingestor.lines(), &DecoderOptions::default());
    ingestor.start().unwrap();

    let gsa = nmea_line("GNGSA,A,3,10,07,05,02,29,04,08,13,,,,,1.72,1.03,1.38");
    let gga = nmea_line("GNGGA,092750.000,5321.6802,N,00630.3372,W,4,12,0.62,120.35,M,55.2,M,1.0,0000");
    let mut dat = gsa.into_bytes();
    dat.extend_from_slice(b"$GPGGA,noise*00\r\n");
    dat.extend(gga.into_bytes());

    // deliver in small pieces, the way a slow receiver would
    for chunk in dat.chunks(7) {
        dev.feed(chunk);
        thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(decode_updates(&mut decoder, 1), 1);
    let fix = decoder.fix();
    assert!((fix.lat - 53.361_336_666_666_666).abs() < 1e-9);
    assert!((fix.lon - -6.50562).abs() < 1e-9);
    assert_eq!(fix.alt, 120.35);
    assert_eq!(fix.satellites, 12);
    assert_eq!(fix.hdop, 0.62);
    assert_eq!(fix.pdop, 1.72);
    assert_eq!(fix.vdop, 1.38);
    assert_eq!(fix.time_string(), "09:27:50");
    assert_eq!(fix.quality_name(), "RTK fix");

    // corrections go back the other way
    ingestor.write(&common::fixture(common::FIXTURE_1005)).unwrap();
    assert_eq!(
        *dev.output.lock().unwrap(),
        common::fixture(common::FIXTURE_1005)
    );

    ingestor.stop();
    ingestor.stop();
    assert!(matches!(
        ingestor.write(b"x"),
        Err(gnss_relay::Error::DeviceClosed)
    ));
}
