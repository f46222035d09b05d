//! Standard command handlers
//!
//! Wires the identity commands to the [`DataManager`] record: version and
//! serial number get/set plus the handshake echo. Boards register these
//! once at startup and add their own handlers next to them.

use crate::board_info::{DataManager, RecordError};
use crate::command::{AckCode, Command};
use crate::dispatch::{DispatchError, Dispatcher, Reply};
use iris_hal::RecordStorage;

pub fn handshake<S: RecordStorage>(_mgr: &mut DataManager<S>, _data: &[u8]) -> Reply {
    // Echo with no data; receiving it is what opens the gate.
    Reply::data(&[])
}

pub fn get_software_version<S: RecordStorage>(
    mgr: &mut DataManager<S>,
    _data: &[u8],
) -> Reply {
    Reply::data(mgr.software_version().as_bytes())
}

pub fn get_hardware_version<S: RecordStorage>(
    mgr: &mut DataManager<S>,
    _data: &[u8],
) -> Reply {
    Reply::data(mgr.hardware_version().as_bytes())
}

pub fn set_hardware_version<S: RecordStorage>(mgr: &mut DataManager<S>, data: &[u8]) -> Reply {
    set_string_field(data, |s| mgr.set_hardware_version(s))
}

pub fn get_serial_number<S: RecordStorage>(mgr: &mut DataManager<S>, _data: &[u8]) -> Reply {
    Reply::data(mgr.serial_number().as_bytes())
}

pub fn set_serial_number<S: RecordStorage>(mgr: &mut DataManager<S>, data: &[u8]) -> Reply {
    set_string_field(data, |s| mgr.set_serial_number(s))
}

fn set_string_field(
    data: &[u8],
    set: impl FnOnce(&str) -> Result<(), RecordError>,
) -> Reply {
    if data.is_empty() {
        return Reply::Status(AckCode::EmptyData);
    }
    let Ok(s) = core::str::from_utf8(data) else {
        return Reply::Status(AckCode::Format);
    };
    match set(s) {
        Ok(()) => Reply::Status(AckCode::Finish),
        Err(RecordError::TooLong) => Reply::Status(AckCode::DataAbnormal),
        Err(RecordError::Storage(_)) => Reply::Status(AckCode::OperateAbnormal),
    }
}

/// Register the standard identity handlers on a dispatcher.
pub fn register_standard<S: RecordStorage, const N: usize>(
    dispatcher: &mut Dispatcher<DataManager<S>, N>,
) -> Result<(), DispatchError> {
    dispatcher.register(Command::Handshake.as_u8(), handshake::<S>)?;
    dispatcher.register(Command::GetSoftwareVersion.as_u8(), get_software_version::<S>)?;
    dispatcher.register(Command::SetHardwareVersion.as_u8(), set_hardware_version::<S>)?;
    dispatcher.register(Command::GetHardwareVersion.as_u8(), get_hardware_version::<S>)?;
    dispatcher.register(Command::SetSerialNumber.as_u8(), set_serial_number::<S>)?;
    dispatcher.register(Command::GetSerialNumber.as_u8(), get_serial_number::<S>)?;
    Ok(())
}
