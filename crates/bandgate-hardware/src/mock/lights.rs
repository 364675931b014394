//! Mock LED rings backed by an in-memory pixel buffer.
//!
//! Effects run with real delays so tests can observe their timing, and every
//! effect is appended to a history that tests can inspect.

use crate::{
    Result,
    traits::{LightStrip, StopSignal},
    types::Color,
};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::trace;

/// Fastest spinner frame delay, reached after the warm-up passes.
const SPIN_MIN_FRAME: Duration = Duration::from_micros(1250);

/// Brightness increment of one fade step.
const FADE_INCREMENT: u8 = 5;

/// An effect the mock was asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LightEffect {
    Blink { color: Color, times: u32 },
    FadeOn { color: Color, brightness: u8 },
    FadeOff,
    Spin { color: Color, reverse: bool, width: usize },
    SpinStopped { passes: usize },
    Close,
}

#[derive(Debug)]
struct State {
    pixels: Vec<Color>,
    brightness: u8,
    closed: bool,
    effects: Vec<LightEffect>,
}

/// Mock pair of LED rings.
///
/// # Examples
///
/// ```
/// use bandgate_hardware::mock::MockLights;
/// use bandgate_hardware::traits::LightStrip;
/// use bandgate_hardware::types::Color;
/// use std::time::Duration;
///
/// let lights = MockLights::new(40, 20);
/// lights.fade_on(Color::Green, 100, Duration::ZERO).unwrap();
///
/// assert_eq!(lights.brightness(), 100);
/// assert!(lights.pixels().iter().all(|p| *p == Color::Green));
/// ```
#[derive(Debug)]
pub struct MockLights {
    outer_ring: usize,
    spin_start_frame: Duration,
    state: Mutex<State>,
}

impl MockLights {
    /// Create rings with `outer_ring + inner_ring` pixels, all off.
    pub fn new(outer_ring: usize, inner_ring: usize) -> Self {
        Self {
            outer_ring,
            spin_start_frame: Duration::from_millis(10),
            state: Mutex::new(State {
                pixels: vec![Color::Off; outer_ring + inner_ring],
                brightness: 0,
                closed: false,
                effects: Vec::new(),
            }),
        }
    }

    /// Frame delay of the first spinner pass; each warm-up pass halves it.
    pub fn with_spin_frame(mut self, frame: Duration) -> Self {
        self.spin_start_frame = frame;
        self
    }

    pub fn pixels(&self) -> Vec<Color> {
        self.lock().pixels.clone()
    }

    pub fn brightness(&self) -> u8 {
        self.lock().brightness
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Every effect run so far, in order.
    pub fn effects(&self) -> Vec<LightEffect> {
        self.lock().effects.clone()
    }

    /// Whether all pixels are dark.
    pub fn is_dark(&self) -> bool {
        let state = self.lock();
        state.brightness == 0 || state.pixels.iter().all(Color::is_off)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, effect: LightEffect) {
        trace!(?effect, "Light effect");
        self.lock().effects.push(effect);
    }

    fn fill(&self, color: Color) {
        self.lock().pixels.fill(color);
    }

    fn set_brightness(&self, brightness: u8) {
        self.lock().brightness = brightness;
    }

    /// One chase around the outer ring. Returns false if the strip closed.
    fn chase(&self, color: Color, reverse: bool, width: usize, frame: Duration) -> bool {
        let ring = self.outer_ring;
        if ring == 0 {
            std::thread::sleep(frame);
            return !self.is_closed();
        }
        for step in 0..ring + width {
            {
                let mut state = self.lock();
                if state.closed {
                    return false;
                }
                let index = |i: usize| if reverse { ring - 1 - i } else { i };
                if step < ring {
                    state.pixels[index(step)] = color;
                }
                if step >= width {
                    state.pixels[index(step - width)] = Color::Off;
                }
            }
            std::thread::sleep(frame);
        }
        true
    }
}

impl LightStrip for MockLights {
    fn blink(&self, color: Color, brightness: u8, times: u32, delay: Duration) -> Result<()> {
        self.record(LightEffect::Blink { color, times });
        self.set_brightness(brightness);
        for i in 0..times {
            self.fill(color);
            std::thread::sleep(delay);
            self.fill(Color::Off);
            if i + 1 < times {
                std::thread::sleep(delay);
            }
        }
        Ok(())
    }

    fn fade_on(&self, color: Color, brightness: u8, step_delay: Duration) -> Result<()> {
        self.record(LightEffect::FadeOn { color, brightness });
        self.fill(color);
        let mut level: u8 = 0;
        while level < brightness {
            level = level.saturating_add(FADE_INCREMENT).min(brightness);
            self.set_brightness(level);
            std::thread::sleep(step_delay);
        }
        Ok(())
    }

    fn fade_off(&self, step_delay: Duration) -> Result<()> {
        self.record(LightEffect::FadeOff);
        let mut level = self.brightness();
        while level > 0 {
            level = level.saturating_sub(FADE_INCREMENT);
            self.set_brightness(level);
            std::thread::sleep(step_delay);
        }
        self.fill(Color::Off);
        Ok(())
    }

    fn spin(
        &self,
        color: Color,
        brightness: u8,
        reverse: bool,
        width: usize,
        stop: &StopSignal,
    ) -> Result<()> {
        self.record(LightEffect::Spin {
            color,
            reverse,
            width,
        });
        self.set_brightness(brightness);

        let mut frame = self.spin_start_frame;
        let mut passes = 0;
        while !stop.is_cancelled() {
            if !self.chase(color, reverse, width, frame) {
                break;
            }
            passes += 1;
            frame = (frame / 2).max(SPIN_MIN_FRAME.min(self.spin_start_frame));
        }

        self.fill(Color::Off);
        self.record(LightEffect::SpinStopped { passes });
        Ok(())
    }

    fn close(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.pixels.fill(Color::Off);
        state.brightness = 0;
        state.effects.push(LightEffect::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_fade_on_then_off() {
        let lights = MockLights::new(4, 2);

        lights.fade_on(Color::Blue, 100, Duration::ZERO).unwrap();
        assert_eq!(lights.brightness(), 100);
        assert!(lights.pixels().iter().all(|p| *p == Color::Blue));

        lights.fade_off(Duration::ZERO).unwrap();
        assert!(lights.is_dark());
        assert!(lights.pixels().iter().all(Color::is_off));
    }

    #[test]
    fn test_blink_timing() {
        let lights = MockLights::new(4, 2);

        let started = Instant::now();
        lights
            .blink(Color::White, 100, 2, Duration::from_millis(10))
            .unwrap();

        // on, off, on: three delays
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert!(lights.is_dark());
        assert_eq!(
            lights.effects(),
            vec![LightEffect::Blink {
                color: Color::White,
                times: 2
            }]
        );
    }

    #[test]
    fn test_spin_runs_until_stopped() {
        let lights = Arc::new(MockLights::new(8, 4).with_spin_frame(Duration::from_millis(1)));
        let stop = StopSignal::new();

        let spinner = {
            let lights = Arc::clone(&lights);
            let stop = stop.clone();
            std::thread::spawn(move || lights.spin(Color::White, 100, true, 3, &stop))
        };
        std::thread::sleep(Duration::from_millis(50));
        stop.cancel();
        spinner.join().unwrap().unwrap();

        assert!(lights.is_dark());
        let effects = lights.effects();
        assert!(matches!(effects.last(), Some(LightEffect::SpinStopped { passes }) if *passes > 0));
    }

    #[test]
    fn test_spin_without_outer_ring_paces_frames() {
        let lights = Arc::new(MockLights::new(0, 4).with_spin_frame(Duration::from_millis(1)));
        let stop = StopSignal::new();

        let spinner = {
            let lights = Arc::clone(&lights);
            let stop = stop.clone();
            std::thread::spawn(move || lights.spin(Color::White, 100, false, 3, &stop))
        };
        std::thread::sleep(Duration::from_millis(30));
        stop.cancel();
        spinner.join().unwrap().unwrap();

        match lights.effects().last() {
            Some(LightEffect::SpinStopped { passes }) => assert!(*passes <= 40, "{passes} passes"),
            other => panic!("unexpected last effect: {other:?}"),
        }
    }

    #[test]
    fn test_close_stops_spin() {
        let lights = Arc::new(MockLights::new(8, 4).with_spin_frame(Duration::from_millis(1)));
        let stop = StopSignal::new();

        let spinner = {
            let lights = Arc::clone(&lights);
            std::thread::spawn(move || lights.spin(Color::White, 100, false, 3, &stop))
        };
        std::thread::sleep(Duration::from_millis(20));
        lights.close();
        lights.close();
        spinner.join().unwrap().unwrap();

        assert!(lights.is_closed());
        let closes = lights
            .effects()
            .iter()
            .filter(|e| **e == LightEffect::Close)
            .count();
        assert_eq!(closes, 1);
    }
}
