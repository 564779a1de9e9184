//! Scripted transport shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use ledger_gitopia::{Error, Result, Transport};

/// Everything a [`MockTransport`] observed, shared with the test body.
#[derive(Debug, Default)]
pub struct Recorder {
    pub commands: Vec<Vec<u8>>,
    pub closes: usize,
}

/// A transport answering from a script and recording every command.
pub struct MockTransport {
    responses: VecDeque<Result<Vec<u8>>>,
    fallback: Option<Vec<u8>>,
    fail_close: bool,
    recorder: Rc<RefCell<Recorder>>,
}

impl MockTransport {
    pub fn new(responses: Vec<Result<Vec<u8>>>) -> (Self, Rc<RefCell<Recorder>>) {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let transport = Self {
            responses: responses.into_iter().collect(),
            fallback: None,
            fail_close: false,
            recorder: Rc::clone(&recorder),
        };
        (transport, recorder)
    }

    /// Answers with `response` once the script is exhausted.
    pub fn with_fallback(mut self, response: Vec<u8>) -> Self {
        self.fallback = Some(response);
        self
    }

    /// Makes `close` report an error after recording the call.
    pub fn with_failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

impl Transport for MockTransport {
    fn exchange(&mut self, command: &[u8]) -> Result<Vec<u8>> {
        self.recorder.borrow_mut().commands.push(command.to_vec());
        match self.responses.pop_front() {
            Some(response) => response,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| Error::Exchange("no response scripted".to_string())),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.recorder.borrow_mut().closes += 1;
        if self.fail_close {
            return Err(Error::TransportUnavailable("device already gone".to_string()));
        }
        Ok(())
    }
}

/// Appends the success status word to `data`.
pub fn ok(data: &[u8]) -> Result<Vec<u8>> {
    Ok(with_status(data, 0x9000))
}

/// Appends `status` to `data`.
pub fn with_status(data: &[u8], status: u16) -> Vec<u8> {
    let mut response = data.to_vec();
    response.extend_from_slice(&status.to_be_bytes());
    response
}

/// App name response for `name`.
pub fn app_name_response(name: &str) -> Result<Vec<u8>> {
    let mut data = vec![1, name.len() as u8];
    data.extend_from_slice(name.as_bytes());
    ok(&data)
}

/// Responses for a successful open of the Gitopia app, version 0.1.2.
pub fn gitopia_open() -> Vec<Result<Vec<u8>>> {
    vec![app_name_response("Gitopia"), ok(&[0, 0, 1, 2])]
}

pub const GET_APP_NAME: [u8; 5] = [0xB0, 0x01, 0x00, 0x00, 0x00];
pub const GET_VERSION: [u8; 5] = [0x55, 0x00, 0x00, 0x00, 0x00];

pub const PATH: [u32; 5] = [44, 118, 0, 0, 0];

/// `PATH` as encoded by the Gitopia app.
pub fn path_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    for (index, element) in PATH.iter().enumerate() {
        let value = if index < 3 { element | 0x8000_0000 } else { *element };
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}
