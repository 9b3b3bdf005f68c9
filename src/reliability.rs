
use tokio::time::Duration;

use crate::channel::CanChannel;
use crate::error::{Error, Result};

/// Default number of times a request is attempted before its error reaches
/// the caller.
pub const MAX_NO_RETRIES: u32 = 3;

/// The retry supervisor wrapped around a [`CanChannel`].
///
/// A request that fails with a transient error (timeout, protocol upset,
/// pipe trouble) is re-issued until the attempt budget runs out; definitive
/// outcomes pass straight through. The number of attempts the last call
/// used stays observable for diagnostics.
pub struct Reliability {
    channel: CanChannel,
    max_retries: u32,
    retry_attempts: u32,
}

impl Reliability {
    pub fn new(channel: CanChannel) -> Self {
        Reliability {
            channel,
            max_retries: MAX_NO_RETRIES,
            retry_attempts: 0,
        }
    }

    /// Overrides the attempt budget. Zero attempts make no sense.
    pub fn set_max_retries(&mut self, max_retries: u32) -> Result<()> {
        if max_retries == 0 {
            return Err(Error::ErrInvalidArgs);
        }
        self.max_retries = max_retries;
        Ok(())
    }

    /// Attempts used by the most recent [`Reliability::request`] call.
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// Sends `cmd` and collects the device's response into `out`, retrying
    /// the whole transaction on transient failure. Each attempt gets the
    /// full per-call `timeout`; within an attempt the unused budget carries
    /// across the fragment receives.
    pub async fn request(
        &mut self,
        cmd: &[u8],
        out: &mut [u8],
        timeout: Duration,
    ) -> Result<usize> {
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.channel.request(cmd, out, timeout).await {
                Ok(len) => {
                    self.retry_attempts = attempts;
                    return Ok(len);
                }
                Err(err) if err.is_retryable() && attempts < self.max_retries => {
                    log::debug!(
                        "request attempt {attempts}/{} failed: {err}; retrying",
                        self.max_retries
                    );
                }
                Err(err) => {
                    self.retry_attempts = attempts;
                    return Err(err);
                }
            }
        }
    }

    /// Fire-and-forget transmit, no response collected and no retries.
    pub async fn tx(&self, payload: &[u8], streaming: bool) -> Result<()> {
        self.channel.tx(payload, streaming).await
    }

    /// The unused part of the last timed receive on the wrapped channel.
    pub fn remaining_timeout(&self) -> Duration {
        self.channel.remaining_timeout()
    }

    pub fn channel(&self) -> &CanChannel {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut CanChannel {
        &mut self.channel
    }

    /// Closes the wrapped channel.
    pub async fn close(self) -> Result<()> {
        self.channel.close().await
    }
}
