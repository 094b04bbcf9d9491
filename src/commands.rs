// Tauri command handlers
use tauri::State;

use crate::controller::KeepAliveStatus;
use crate::platform::InterruptionEvent;
use crate::state::KeepAliveState;

#[tauri::command]
pub fn start(state: State<'_, KeepAliveState>) -> Result<(), String> {
    state.start();
    Ok(())
}

/// Like `start`, but reports why the silent player could not start.
#[tauri::command]
pub fn try_start(state: State<'_, KeepAliveState>) -> Result<(), String> {
    state
        .controller
        .try_start(&state.registrar)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn refresh(state: State<'_, KeepAliveState>) -> Result<(), String> {
    state.refresh();
    Ok(())
}

#[tauri::command]
pub fn stop(state: State<'_, KeepAliveState>) -> Result<(), String> {
    state.controller.stop();
    Ok(())
}

#[tauri::command]
pub fn status(state: State<'_, KeepAliveState>) -> Result<KeepAliveStatus, String> {
    Ok(state.controller.status())
}

// ===== Alarm bookkeeping =====

#[tauri::command]
pub fn add_requester(alarm_id: i32, state: State<'_, KeepAliveState>) -> Result<bool, String> {
    Ok(state.controller.add_requester(alarm_id))
}

#[tauri::command]
pub fn release(alarm_id: i32, state: State<'_, KeepAliveState>) -> Result<(), String> {
    state.controller.release(alarm_id);
    Ok(())
}

// ===== Platform events =====

/// Forwarded by the mobile shell when the OS reports an audio interruption.
#[tauri::command]
pub fn notify_interruption(kind: String, state: State<'_, KeepAliveState>) -> Result<usize, String> {
    let event: InterruptionEvent = kind.parse().map_err(|_| format!("bad interruption kind: {kind}"))?;
    Ok(state.interruptions.post(event))
}
