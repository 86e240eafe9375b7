mod args;

#[macro_use]
extern crate log;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use padscan::app_config::{AppConfig, Backend};
use padscan::display::{BACKGROUND, DisplaySink, Framebuffer, FramebufferConfig, KeyGrid};
use padscan::input::analog::IioChannel;
use padscan::input::gpio::{CdevInput, RppalInput, RppalMatrix};
use padscan::input::{
    Button, DigitalInput, InputConfig, InputSubsystem, QuadratureEncoder, RotaryEncoder,
};

use rppal::gpio::Gpio;

use self::args::Args;

const EXITCODE_SUCCESS: i32 = 0;
const EXITCODE_CONFIG: i32 = 1;
const EXITCODE_INPUT_INIT_FAILS: i32 = 2;
const EXITCODE_DISPLAY_FAILS: i32 = 3;

fn main() {
    let exit_status = real_main();
    if exit_status != EXITCODE_SUCCESS {
        std::process::exit(exit_status);
    }
}

fn real_main() -> i32 {
    let args: Args = argh::from_env();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .init();

    let config = match AppConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Could not load configuration: {e}");
            return EXITCODE_CONFIG;
        }
    };

    let mut input = match build_input(&config) {
        Ok(input) => input,
        Err(e) => {
            error!("Could not initialize input: {e}");
            return EXITCODE_INPUT_INIT_FAILS;
        }
    };

    let mut display = None;
    if let Some(display_config) = config.display.as_ref().filter(|_| !args.no_display) {
        match Framebuffer::new(FramebufferConfig {
            path: display_config.path.clone(),
            width: display_config.width,
            height: display_config.height,
            bytes_per_pixel: display_config.bytes_per_pixel,
            stride_pixels: display_config.stride_pixels,
        }) {
            Ok(mut framebuffer) => {
                framebuffer.clear(BACKGROUND);
                let (width, height) = framebuffer.size();
                let grid = KeyGrid::new(input.layout().total(), width, height);
                display = Some((framebuffer, grid));
            }
            Err(e) => {
                error!("Could not open framebuffer: {e}");
                return EXITCODE_DISPLAY_FAILS;
            }
        }
    }

    let exit_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = exit_flag.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst)) {
        warn!("Could not install interrupt handler: {e}");
    }

    let labels = config.key_labels();
    let label = |index: usize| labels.get(index).map(String::as_str).unwrap_or("?");
    let poll_interval = config.poll_interval();
    let mut frames = 0u64;

    info!("polling every {poll_interval:?}");
    while !exit_flag.load(Ordering::SeqCst) {
        if args.frames.is_some_and(|limit| frames >= limit) {
            break;
        }
        frames += 1;

        let frame = input.poll();
        for key in frame.just_pressed() {
            info!("{} ({key}) pressed", label(key.index()));
        }
        for key in frame.just_released() {
            info!(
                "{} ({key}) released after {} frames",
                label(key.index()),
                frame.duration_of(*key)
            );
        }
        if let Some((framebuffer, grid)) = display.as_mut() {
            if let Err(e) = grid.present(frame.pressed(), framebuffer) {
                error!("Could not write to framebuffer: {e}");
                return EXITCODE_DISPLAY_FAILS;
            }
        }
        drop(frame);

        std::thread::sleep(poll_interval);
    }

    info!("stopped after {frames} frames");
    EXITCODE_SUCCESS
}

fn build_input(config: &AppConfig) -> anyhow::Result<InputSubsystem> {
    let gpio = match config.backend {
        Backend::Rppal => Some(
            Gpio::new().map_err(|e| anyhow::anyhow!("Could not connect to GPIO: {e}"))?,
        ),
        Backend::Cdev => None,
    };
    info!("using {} GPIO backend", config.backend);
    let mut input = InputConfig::default().with_debounce(config.debounce);

    if let Some(matrix) = &config.matrix {
        let gpio = gpio
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("key matrix scanning requires the rppal backend"))?;
        input = input.with_matrix(RppalMatrix::try_new(gpio, &matrix.rows, &matrix.cols)?);
    }

    for button in &config.buttons {
        let active_low = button.active_low.unwrap_or(config.default_active_low);
        let line = digital_input(config, gpio.as_ref(), button.gpio, active_low)?;
        input = input.with_button(Button::new(line, active_low));
    }

    if let Some(encoder) = &config.encoder {
        let a = digital_input(config, gpio.as_ref(), encoder.pin_a, config.default_active_low)?;
        let b = digital_input(config, gpio.as_ref(), encoder.pin_b, config.default_active_low)?;
        input = input.with_encoder(RotaryEncoder::new(
            QuadratureEncoder::spawn(a, b, encoder.steps_per_detent, encoder.sample_interval()),
            encoder.invert,
        ));
    }

    for joystick in &config.joysticks {
        let channel = IioChannel::try_new(joystick.path.clone(), joystick.threshold)?;
        debug!("joystick channel {}", channel.path().display());
        input = input.with_joystick(channel);
    }

    Ok(InputSubsystem::new(input)?)
}

fn digital_input(
    config: &AppConfig,
    gpio: Option<&Gpio>,
    pin: u8,
    active_low: bool,
) -> anyhow::Result<Box<dyn DigitalInput + Send>> {
    let line: Box<dyn DigitalInput + Send> = match gpio {
        Some(gpio) => Box::new(RppalInput::try_new(gpio, pin, active_low)?),
        None => Box::new(CdevInput::try_new(
            &config.gpio_chip,
            u32::from(pin),
            active_low,
        )?),
    };
    Ok(line)
}
