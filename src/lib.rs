//! Gate Runner - run loop and Tauri backend
//!
//! The `game_server` module is the whole game: a cube runs down the track and
//! gates rewrite the score. With the `desktop` feature the crate also builds
//! the Tauri shell that drives it from the frontend.

pub mod game_server;

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
mod desktop {
    use crate::game_server::gate::Gate;
    use crate::game_server::run::{RunConfig, RunResult, RunSnapshot};
    use crate::game_server::simulation::{GameServer, GameState, ServerStats, TickReport};
    use std::sync::Mutex;
    use tauri::{AppHandle, Emitter, State};

    /// Initialize a new run with the given configuration
    #[tauri::command]
    fn init_run(
        server: State<'_, Mutex<GameServer>>,
        config: Option<RunConfig>,
        seed: Option<u64>,
    ) -> Result<(), String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;

        let mut config = config.unwrap_or_default();
        if seed.is_some() {
            config.seed = seed;
        }

        server.init_run(config).map_err(|e| e.to_string())
    }

    /// Initialize a new run over an explicit gate list
    #[tauri::command]
    fn init_with_gates(
        server: State<'_, Mutex<GameServer>>,
        config: Option<RunConfig>,
        gates: Vec<Gate>,
    ) -> Result<(), String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server
            .init_with_gates(config.unwrap_or_default(), gates)
            .map_err(|e| e.to_string())
    }

    /// Start the run
    #[tauri::command]
    fn start_run(server: State<'_, Mutex<GameServer>>) -> Result<(), String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.start();
        Ok(())
    }

    /// Perform a simulation tick and return the new state.
    ///
    /// Finished runs are also pushed to the frontend as `run-ended` events.
    #[tauri::command]
    fn tick(
        app: AppHandle,
        server: State<'_, Mutex<GameServer>>,
    ) -> Result<Option<TickReport>, String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        let report = server.tick();

        // The run has already advanced, so a failed emit must not lose the report
        if let Some(report) = &report {
            for result in report.runs_ended() {
                if let Err(e) = app.emit("run-ended", result) {
                    log::warn!("failed to emit run-ended for run {}: {}", result.run_number, e);
                }
            }
        }

        Ok(report)
    }

    /// Steering key pressed
    #[tauri::command]
    fn key_down(server: State<'_, Mutex<GameServer>>, key: String) -> Result<bool, String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        Ok(server.key_down(&key))
    }

    /// Steering key released
    #[tauri::command]
    fn key_up(server: State<'_, Mutex<GameServer>>, key: String) -> Result<bool, String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        Ok(server.key_up(&key))
    }

    /// Viewport resized
    #[tauri::command]
    fn resize(
        server: State<'_, Mutex<GameServer>>,
        width: u32,
        height: u32,
    ) -> Result<(), String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.resize(width, height);
        Ok(())
    }

    /// Get current run snapshot without advancing simulation
    #[tauri::command]
    fn get_snapshot(server: State<'_, Mutex<GameServer>>) -> Result<Option<RunSnapshot>, String> {
        let server = server.lock().map_err(|e| e.to_string())?;
        Ok(server.get_snapshot())
    }

    /// Get finished runs
    #[tauri::command]
    fn get_results(server: State<'_, Mutex<GameServer>>) -> Result<Option<Vec<RunResult>>, String> {
        let server = server.lock().map_err(|e| e.to_string())?;
        Ok(server.get_results())
    }

    /// Get server statistics
    #[tauri::command]
    fn get_stats(server: State<'_, Mutex<GameServer>>) -> Result<ServerStats, String> {
        let server = server.lock().map_err(|e| e.to_string())?;
        Ok(server.get_stats())
    }

    /// Get current game state
    #[tauri::command]
    fn get_game_state(server: State<'_, Mutex<GameServer>>) -> Result<GameState, String> {
        let server = server.lock().map_err(|e| e.to_string())?;
        Ok(server.get_state())
    }

    /// Pause the simulation
    #[tauri::command]
    fn pause_run(server: State<'_, Mutex<GameServer>>) -> Result<(), String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.pause();
        Ok(())
    }

    /// Resume the simulation
    #[tauri::command]
    fn resume_run(server: State<'_, Mutex<GameServer>>) -> Result<(), String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.resume();
        Ok(())
    }

    /// Reset to idle state
    #[tauri::command]
    fn reset_run(server: State<'_, Mutex<GameServer>>) -> Result<(), String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.reset();
        Ok(())
    }

    #[cfg_attr(mobile, tauri::mobile_entry_point)]
    pub fn run() {
        tauri::Builder::default()
            .manage(Mutex::new(GameServer::new()))
            .setup(|app| {
                if cfg!(debug_assertions) {
                    app.handle().plugin(
                        tauri_plugin_log::Builder::default()
                            .level(log::LevelFilter::Info)
                            .build(),
                    )?;
                }
                log::info!("Gate Runner game server initialized");
                Ok(())
            })
            .invoke_handler(tauri::generate_handler![
                init_run,
                init_with_gates,
                start_run,
                tick,
                key_down,
                key_up,
                resize,
                get_snapshot,
                get_results,
                get_stats,
                get_game_state,
                pause_run,
                resume_run,
                reset_run,
            ])
            .run(tauri::generate_context!())
            .expect("error while running tauri application");
    }
}
