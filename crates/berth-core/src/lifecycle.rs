use crate::RuntimeError;
use berth_model::MachineStatus;

pub fn validate_transition(from: MachineStatus, to: MachineStatus) -> Result<(), RuntimeError> {
    let valid = matches!(
        (from, to),
        (
            MachineStatus::Starting,
            MachineStatus::Running | MachineStatus::Failed | MachineStatus::Stopped
        ) | (
            MachineStatus::Running,
            MachineStatus::Stopped | MachineStatus::Failed
        )
    );

    if valid {
        Ok(())
    } else {
        Err(RuntimeError::InvalidTransition { from, to })
    }
}
