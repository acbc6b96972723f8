//! GPIO binding: clock-line interrupt and data-line reads.
//!
//! The ISR service passes one opaque argument to the handler. It points at
//! a leaked [`IsrContext`] that owns the producer half of the link, so the
//! handler mutates exactly one decoder and nothing global.

extern crate alloc;

use alloc::boxed::Box;
use core::convert::Infallible;
use core::ffi::c_void;

use embedded_hal::digital::{ErrorType, InputPin};
use esp_idf_svc::sys;

use crate::calipers::Calipers;
use crate::config::{DecoderConfig, EdgePolarity};
use crate::decoder::EdgeDecoder;
use crate::error::InitError;
use crate::link::CaliperLink;

/// Pin assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaliperPins {
    pub data: i32,
    pub clock: i32,
}

/// Milliseconds since boot, wrapping. ISR-safe.
#[inline]
pub fn now_ms() -> u32 {
    // SAFETY: esp_timer_get_time is callable from any context
    (unsafe { sys::esp_timer_get_time() } / 1000) as u32
}

/// Raw data line read through the GPIO input register.
struct DataLine(sys::gpio_num_t);

impl ErrorType for DataLine {
    type Error = Infallible;
}

impl InputPin for DataLine {
    #[inline]
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        // SAFETY: pin configured as input in attach()
        Ok(unsafe { sys::gpio_get_level(self.0) } != 0)
    }

    #[inline]
    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

struct IsrContext {
    decoder: EdgeDecoder<'static>,
    data: DataLine,
}

unsafe extern "C" fn clock_isr(arg: *mut c_void) {
    // SAFETY: arg is the leaked IsrContext registered for this pin only;
    // the ISR service never runs this handler re-entrantly.
    let ctx = unsafe { &mut *(arg as *mut IsrContext) };
    ctx.decoder.on_edge(now_ms(), &mut ctx.data);
}

fn esp_check(err: sys::esp_err_t) -> Result<(), InitError> {
    sys::EspError::convert(err).map_err(|e| InitError::Gpio(e.code()))
}

/// Configure both lines, register the clock interrupt and return the consumer.
///
/// Call once per link; a second call fails with
/// [`InitError::AlreadyAttached`] before touching any pin. A failure while
/// configuring the pins leaves the link free, so `attach` can be retried.
/// A failure to register the handler is permanent: the link stays attached.
pub fn attach(
    link: &'static CaliperLink,
    pins: CaliperPins,
    config: DecoderConfig,
) -> Result<Calipers<'static>, InitError> {
    config.validate()?;
    if link.is_attached() {
        return Err(InitError::AlreadyAttached);
    }

    let data_conf = sys::gpio_config_t {
        pin_bit_mask: 1u64 << pins.data,
        mode: sys::gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: sys::gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: sys::gpio_int_type_t_GPIO_INTR_DISABLE,
        ..Default::default()
    };

    let clock_conf = sys::gpio_config_t {
        pin_bit_mask: 1u64 << pins.clock,
        mode: sys::gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: if config.clock_pull_up {
            sys::gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            sys::gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: match config.edge_polarity {
            EdgePolarity::Rising => sys::gpio_int_type_t_GPIO_INTR_POSEDGE,
            EdgePolarity::Falling => sys::gpio_int_type_t_GPIO_INTR_NEGEDGE,
        },
        ..Default::default()
    };

    // SAFETY: plain ESP-IDF driver calls with valid config structs
    unsafe {
        esp_check(sys::gpio_config(&data_conf))?;
        esp_check(sys::gpio_config(&clock_conf))?;

        // Already installed by another driver is fine
        let err = sys::gpio_install_isr_service(0);
        if err != sys::ESP_ERR_INVALID_STATE as sys::esp_err_t {
            esp_check(err)?;
        }
    }

    let (decoder, calipers) = link.split(config, now_ms())?;

    let ctx = Box::leak(Box::new(IsrContext {
        decoder,
        data: DataLine(pins.data),
    }));

    // SAFETY: ctx lives for the rest of the program and is only touched by clock_isr
    unsafe {
        esp_check(sys::gpio_isr_handler_add(
            pins.clock,
            Some(clock_isr),
            ctx as *mut IsrContext as *mut c_void,
        ))?;
    }

    Ok(calipers)
}
