#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Timer};
use embedded_hal_bus::i2c::CriticalSectionDevice;
use esp_hal::Blocking;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::i2c::master::I2c;
use esp_hal::timer::timg::TimerGroup;
use esp_storage::FlashStorage;
use log::{error, info};
use static_cell::StaticCell;

use envnode_core::storage::FlashBlob;
use envnode_core::{
    Aht20, Bmp180, PostcardStore, RelayController, SensorAggregator, SharedRelayController,
    run_cycle,
};
use envnode_firmware::config::node_config;
use envnode_firmware::hardware::{
    CONFIG_FLASH_OFFSET, EmbassyClock, create_i2c_bus, relay_output,
};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
esp_bootloader_esp_idf::esp_app_desc!();

static I2C_BUS: StaticCell<Mutex<RefCell<I2c<'static, Blocking>>>> = StaticCell::new();

#[allow(
    clippy::large_stack_frames,
    reason = "the sensor, relay and store state all live in main for the life of the program"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let config = node_config();
    info!("envnode starting with {:?}", config);

    let i2c = create_i2c_bus(peripherals.I2C0, peripherals.GPIO1, peripherals.GPIO2)
        .expect("Failed to configure I2C bus");
    let bus = I2C_BUS.init(Mutex::new(RefCell::new(i2c)));

    let aht20 = Aht20::new(CriticalSectionDevice::new(bus), Delay::new());
    embassy_futures::yield_now().await;
    let bmp180 = Bmp180::new(CriticalSectionDevice::new(bus), Delay::new());
    let mut sensors = SensorAggregator::from_init_results(Ok(aht20), bmp180, EmbassyClock);

    let flash = FlashStorage::new(peripherals.FLASH);
    let store = PostcardStore::open(FlashBlob::new(flash, CONFIG_FLASH_OFFSET));
    let controller = match RelayController::load(store, relay_output(peripherals.GPIO47), &config.relay) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Relay controller failed to start: {}", e);
            loop {
                Timer::after(Duration::from_secs(60)).await;
            }
        }
    };
    let relay: SharedRelayController<CriticalSectionRawMutex, _, _> =
        SharedRelayController::new(controller);
    info!("Relay ready: {:?}", relay.get_relay_status());

    let interval = Duration::from_millis(u64::from(config.acquisition_interval_ms));
    loop {
        let report = run_cycle(&mut sensors, &relay);
        if let Some(state) = report.transition {
            info!("Relay switched {:?}", state);
        }

        embassy_futures::yield_now().await;
        Timer::after(interval).await;
    }
}
