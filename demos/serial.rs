use std::env;

use genesys_psu::channel::{Channel, GROUP_SETTLE, RECOMMENDED_READ_TIMEOUT};
use genesys_psu::command::Switch;
use genesys_psu::psu::{self, Genesys};
use genesys_psu::register::BaudRate;
use inquire::Select;
use serialport::SerialPort;

// Configuration constants - adjust these for your setup.
const BAUD_RATE: BaudRate = BaudRate::B9600;
const UNIT_ADDRESS: u8 = 6;
const OUTPUT_VOLTAGE: f32 = 5.0; // volts
const CURRENT_LIMIT: f32 = 0.1; // amps
const STABILIZATION_DELAY_MS: u64 = 1000;

pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

fn main() {
    // Get serial port from command line arg or interactive selection
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

        Select::new("Select a serial port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {}", port_name);

    // 8N1 is the serialport default, matching the supply's fixed framing.
    let port = serialport::new(&port_name, u32::from(BAUD_RATE))
        .timeout(std::time::Duration::from_millis(
            RECOMMENDED_READ_TIMEOUT.to_millis() as u64,
        ))
        .open()
        .expect("Failed to open serial port");

    let mut channel: Channel<PortWrapper> = Channel::new(PortWrapper(port));

    // Check the unit answers fast queries before committing to a session.
    match channel.fast_connection_test(UNIT_ADDRESS).unwrap() {
        None => {
            eprintln!("No supply answered at address {}", UNIT_ADDRESS);
            std::process::exit(1);
        }
        Some(multi_drop) => println!("Supply found (multi-drop enabled: {})", multi_drop),
    }

    // Connecting locks out the front panel and reads the model ratings.
    let psu = Genesys::connect(&mut channel, UNIT_ADDRESS).unwrap();
    println!("Identity: {}", psu.identity(&mut channel).unwrap());
    println!("Firmware: {}", psu.revision(&mut channel).unwrap());
    println!(
        "Ratings:  {:.1} V / {:.1} A",
        psu.ratings().voltage_max(),
        psu.ratings().current_max
    );

    if let Some(minutes) = channel.fast_power_on_time(UNIT_ADDRESS).unwrap() {
        println!("Lifetime on-time: {} minutes", minutes);
    }

    // Open the programming window before setting the voltage.
    psu.program_under_voltage(&mut channel, 0.0).unwrap();
    psu.set_over_voltage_max(&mut channel).unwrap();

    psu.program_voltage(&mut channel, OUTPUT_VOLTAGE).unwrap();
    println!("Set output voltage to {}V", OUTPUT_VOLTAGE);

    psu.program_current(&mut channel, CURRENT_LIMIT).unwrap();
    println!("Set current limit to {}A", CURRENT_LIMIT);

    psu.set_output(&mut channel, Switch::On).unwrap();
    println!("Output enabled");

    // Wait for the output to stabilize
    std::thread::sleep(std::time::Duration::from_millis(STABILIZATION_DELAY_MS));

    let readout = psu.measurements(&mut channel).unwrap();
    println!(
        "Measured: {:.3}V / {:.3}A (mode {})",
        readout.voltage_measured,
        readout.current_measured,
        psu.operation_mode(&mut channel).unwrap()
    );

    let report = psu.status(&mut channel).unwrap();
    println!(
        "Status register: {:02X}, fault register: {:02X}",
        report.status_register, report.fault_register
    );
    if report.faults().over_temperature() {
        eprintln!("Over-temperature fault is active!");
    }

    psu.set_output(&mut channel, Switch::Off).unwrap();
    println!("Output disabled");

    // Leave every supply on the bus in its stored state and the panel usable.
    psu::group_recall_settings(&mut channel).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(
        GROUP_SETTLE.to_millis() as u64
    ));
    channel.forget_selection();
    println!("Done");
}
