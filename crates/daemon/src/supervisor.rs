// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The real [`fleet_core::ChildSupervisor`]: spawns the backend process,
//! captures its stdout/stderr into a bounded ring buffer, and answers
//! health-wait polls by probing the backend's TCP port.
//!
//! This is deliberately the only part of the child-process subsystem this
//! repository implements in depth — auto-restart policy, structured health
//! checks, and backend-specific argument construction are external
//! collaborators.

use fleet_core::{ChildSupervisor, ManagerError, Options, Result};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const MAX_LOG_LINES: usize = 2000;
const GRACEFUL_STOP_TIMEOUT: Duration = Duration::from_secs(5);

struct Logs {
    lines: Mutex<VecDeque<String>>,
}

impl Logs {
    fn new() -> Arc<Self> {
        Arc::new(Logs { lines: Mutex::new(VecDeque::with_capacity(MAX_LOG_LINES)) })
    }

    fn push(&self, line: String) {
        let mut lines = self.lines.lock();
        if lines.len() >= MAX_LOG_LINES {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    fn tail(&self, n: usize) -> String {
        let lines = self.lines.lock();
        let skip = lines.len().saturating_sub(n);
        lines.iter().skip(skip).cloned().collect::<Vec<_>>().join("\n")
    }
}

fn spawn_reader(mut reader: impl BufRead + Send + 'static, logs: Arc<Logs>) {
    std::thread::spawn(move || {
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => logs.push(line.trim_end_matches('\n').to_string()),
            }
        }
    });
}

/// Spawns and supervises one backend process via `std::process::Command`.
/// One instance of [`ProcessSupervisor`] per managed instance name.
pub struct ProcessSupervisor {
    name: String,
    child: Mutex<Option<Child>>,
    logs: Arc<Logs>,
    port: AtomicU16,
}

impl ProcessSupervisor {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(ProcessSupervisor {
            name: name.into(),
            child: Mutex::new(None),
            logs: Logs::new(),
            port: AtomicU16::new(0),
        })
    }
}

impl ChildSupervisor for ProcessSupervisor {
    fn start(&self, options: &Options) -> Result<()> {
        let backend = &options.backend_options;
        self.port.store(backend.get_port(), Ordering::Relaxed);

        let mut command = Command::new(&backend.command);
        command.args(&backend.args);
        for (key, value) in &options.environment {
            command.env(key, value);
        }
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| {
            ManagerError::Child(format!("failed to spawn backend for {:?}: {e}", self.name))
        })?;

        if let Some(stdout) = child.stdout.take() {
            spawn_reader(BufReader::new(stdout), self.logs.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(BufReader::new(stderr), self.logs.clone());
        }

        *self.child.lock() = Some(child);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let mut child = match self.child.lock().take() {
            Some(child) => child,
            None => return Ok(()),
        };

        let pid = Pid::from_raw(child.id() as i32);
        if kill(pid, Signal::SIGTERM).is_ok() {
            let deadline = Instant::now() + GRACEFUL_STOP_TIMEOUT;
            loop {
                match child.try_wait() {
                    Ok(Some(_)) => return Ok(()),
                    Ok(None) if Instant::now() < deadline => {
                        std::thread::sleep(Duration::from_millis(50));
                    }
                    _ => break,
                }
            }
        }

        child.kill().map_err(|e| {
            ManagerError::Child(format!("failed to kill backend for {:?}: {e}", self.name))
        })?;
        let _ = child.wait();
        Ok(())
    }

    fn wait_for_healthy(&self, timeout: Duration) -> Result<()> {
        let port = self.port.load(Ordering::Relaxed);
        if port == 0 {
            return Err(ManagerError::HealthTimeout(self.name.clone()));
        }
        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port));
        let deadline = Instant::now() + timeout;
        loop {
            if TcpStream::connect_timeout(&addr, Duration::from_millis(200)).is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ManagerError::HealthTimeout(self.name.clone()));
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    fn get_logs(&self, num_lines: usize) -> String {
        self.logs.tail(num_lines)
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
