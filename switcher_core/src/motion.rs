//! Motion primitives shared by every switcher operation.

use crate::error::Result;
use crate::ports::Port;
use crate::switcher::Switcher;

impl Switcher {
    /// Zero the feeder and queue a move of `distance` (already signed).
    ///
    /// Returns the speed and acceleration used. Waits only when `sync`.
    pub(crate) fn queue_feeder_move(
        &mut self,
        distance: f64,
        slow: bool,
        sync: bool,
    ) -> Result<(f64, f64)> {
        self.hw.feeder_set_zero()?;
        let speed = if slow {
            self.cfg.speeds.slow
        } else {
            self.cfg.speeds.fast
        };
        let accel = self.cfg.speeds.accel;
        self.hw.feeder_move(distance, speed, accel, sync)?;
        Ok((speed, accel))
    }

    /// Seat `port`'s clutch and release all others, then wait for the servos.
    pub(crate) fn activate_clutch(&mut self, port: Port) -> Result<()> {
        let on = self.ports.get(port)?.servo_on_deg;
        let off = self.ports.off_angles();
        self.hw.engage(port, on, &off)?;
        self.hw.settle(self.cfg.timing.servo_settle)
    }

    pub(crate) fn deactivate_all_clutches(&mut self) -> Result<()> {
        let off = self.ports.off_angles();
        self.hw.disengage_all(&off)?;
        self.hw.settle(self.cfg.timing.servo_settle)
    }

    /// Move only `port`'s clutch to its off-angle; no settling.
    pub(crate) fn release_clutch(&mut self, port: Port) -> Result<()> {
        let off = self.ports.get(port)?.servo_off_deg;
        self.hw.set_clutch(port, off)
    }
}
