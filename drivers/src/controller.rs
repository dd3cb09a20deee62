/*++

Licensed under the Apache-2.0 license.

File Name:

    controller.rs

Abstract:

    File contains the execution state machine of a session.

--*/

use crypto_seq_error::{CryptoError, CryptoResult};
use smlang::statemachine;

statemachine! {
    derive_states: [Clone, Copy, Debug],
    transitions: {
        // CurrentState Event = NextState
        *Idle + Start = Running,
        Idle + Step = Running,
        Idle + Halt = Idle,
        Idle + Fault = Discarded,
        Running + Step = Running,
        Running + Halt = Halted,
        Running + Complete = Idle,
        Running + Fault = Discarded,
        Halted + Start = Running,
        Halted + Step = Running,
        Halted + Halt = Halted,
        Halted + Acknowledge = Idle,
        Halted + Fault = Discarded,
    }
}

pub struct Context;

impl StateMachineContext for Context {}

/// Software view of the engine's execution state. The hardware is the
/// source of truth for progress; this only tracks which commands are legal.
pub(crate) struct Controller {
    machine: StateMachine<Context>,
    /// Advancing one instruction per `step()` rather than free running
    stepping: bool,
}

impl Controller {
    pub fn new() -> Self {
        Self {
            machine: StateMachine::new(Context),
            stepping: false,
        }
    }

    pub fn state(&self) -> States {
        *self.machine.state()
    }

    pub fn stepping(&self) -> bool {
        self.stepping
    }

    /// Fails if the session can no longer be used.
    pub fn check_usable(&self) -> CryptoResult<()> {
        if self.state() == States::Discarded {
            return Err(CryptoError::DRIVER_CRYPTO_SESSION_DISCARDED);
        }
        Ok(())
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state(), States::Running | States::Halted)
    }

    fn fire(&mut self, event: Events, err: CryptoError) -> CryptoResult<()> {
        self.check_usable()?;
        self.machine.process_event(event).map_err(|_| err)?;
        Ok(())
    }

    pub fn start(&mut self) -> CryptoResult<()> {
        self.fire(Events::Start, CryptoError::DRIVER_CRYPTO_ALREADY_RUNNING)?;
        self.stepping = false;
        Ok(())
    }

    /// Stepping is refused while the sequence runs freely.
    pub fn step(&mut self) -> CryptoResult<()> {
        if self.state() == States::Running && !self.stepping {
            return Err(CryptoError::DRIVER_CRYPTO_ALREADY_RUNNING);
        }
        self.fire(Events::Step, CryptoError::DRIVER_CRYPTO_ALREADY_RUNNING)?;
        self.stepping = true;
        Ok(())
    }

    pub fn halt(&mut self) -> CryptoResult<()> {
        self.fire(Events::Halt, CryptoError::DRIVER_CRYPTO_NOT_RUNNING)
    }

    pub fn complete(&mut self) -> CryptoResult<()> {
        self.fire(Events::Complete, CryptoError::DRIVER_CRYPTO_NOT_RUNNING)?;
        self.stepping = false;
        Ok(())
    }

    pub fn acknowledge(&mut self) -> CryptoResult<()> {
        self.fire(Events::Acknowledge, CryptoError::DRIVER_CRYPTO_NOT_RUNNING)?;
        self.stepping = false;
        Ok(())
    }

    pub fn fault(&mut self) {
        let _ = self.machine.process_event(Events::Fault);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_to_completion() {
        let mut c = Controller::new();
        c.start().unwrap();
        assert_eq!(c.state(), States::Running);
        assert_eq!(c.start(), Err(CryptoError::DRIVER_CRYPTO_ALREADY_RUNNING));
        c.complete().unwrap();
        assert_eq!(c.state(), States::Idle);
    }

    #[test]
    fn test_halt_is_idempotent() {
        let mut c = Controller::new();
        c.halt().unwrap();
        c.halt().unwrap();
        assert_eq!(c.state(), States::Idle);

        c.start().unwrap();
        c.halt().unwrap();
        c.halt().unwrap();
        assert_eq!(c.state(), States::Halted);
        c.start().unwrap();
        assert_eq!(c.state(), States::Running);
    }

    #[test]
    fn test_step_mode() {
        let mut c = Controller::new();
        c.step().unwrap();
        c.step().unwrap();
        assert!(c.stepping());
        assert_eq!(c.state(), States::Running);

        c.start().unwrap_err();
        c.halt().unwrap();
        c.start().unwrap();
        assert!(!c.stepping());
        assert_eq!(c.step(), Err(CryptoError::DRIVER_CRYPTO_ALREADY_RUNNING));
    }

    #[test]
    fn test_fault_discards() {
        let mut c = Controller::new();
        c.start().unwrap();
        c.fault();
        assert_eq!(c.state(), States::Discarded);
        assert_eq!(c.halt(), Err(CryptoError::DRIVER_CRYPTO_SESSION_DISCARDED));
        assert_eq!(c.start(), Err(CryptoError::DRIVER_CRYPTO_SESSION_DISCARDED));
    }

    #[test]
    fn test_acknowledge_only_from_halted() {
        let mut c = Controller::new();
        assert_eq!(c.acknowledge(), Err(CryptoError::DRIVER_CRYPTO_NOT_RUNNING));
        c.start().unwrap();
        c.halt().unwrap();
        c.acknowledge().unwrap();
        assert_eq!(c.state(), States::Idle);
    }
}
