/// Modem session tracking.
///
/// The LoRa modem is driven with AT commands over a serial line and reports
/// back with free-form text. [`LoraManager`] frames that text, recognizes the
/// handful of status lines that matter (join, reset banner, downlink notice,
/// downlink data) and echoes everything else to the operator console. It
/// also owns the uplink cadence and the `AT+CFG` downlink fetch.
use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};
use heapless::Vec;

use crate::board;
use crate::clock::Clock;
use crate::defaults::{
    CMD_FETCH_DOWNLINK, CMD_RESET, DOWNLINK_SETTLE_MS, LINE_CAPACITY, LINE_ENDING,
    PREFIX_DOWNLINK_DATA, PREFIX_DOWNLINK_NOTICE, PREFIX_JOINED, PREFIX_RESET_BANNER,
    UPLINK_INTERVAL_MS,
};
use crate::error::LinkError;
use crate::framer::{Frame, LineFramer};
use crate::payload::MeasurementRecord;

/// Downlink payload as the modem prints it: `<fport>:<hex>`
pub type Downlink = Vec<u8, LINE_CAPACITY>;

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Minimum time between uplink windows
    pub uplink_interval_ms: u64,
    /// Pause before `AT+CFG` after a downlink notice
    pub downlink_settle_ms: u32,
}

impl SessionConfig {
    pub const fn new() -> Self {
        Self {
            uplink_interval_ms: UPLINK_INTERVAL_MS,
            downlink_settle_ms: DOWNLINK_SETTLE_MS,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Link state. Lives only in RAM; a reboot starts unjoined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub joined: bool,
    pub last_uplink_at: u64,
    /// A downlink notice was seen and `AT+CFG` has not been sent yet
    pub downlink_available: bool,
    /// `AT+CFG` was sent this uplink window; modem output is not echoed
    pub downlink_fetched: bool,
}

impl SessionState {
    pub const fn new(now_ms: u64) -> Self {
        Self {
            joined: false,
            last_uplink_at: now_ms,
            downlink_available: false,
            downlink_fetched: false,
        }
    }
}

/// What a completed modem record means to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent<'a> {
    Joined,
    Reset,
    DownlinkNotice,
    /// Bytes after the `AT+RECVB=` prefix
    Downlink(&'a [u8]),
    Other(&'a [u8]),
}

/// Classify a modem record by prefix.
pub fn classify_line(line: &[u8]) -> LineEvent<'_> {
    if line.starts_with(PREFIX_JOINED.as_bytes()) {
        LineEvent::Joined
    } else if line.starts_with(PREFIX_RESET_BANNER.as_bytes()) {
        LineEvent::Reset
    } else if line.starts_with(PREFIX_DOWNLINK_NOTICE.as_bytes()) {
        LineEvent::DownlinkNotice
    } else if let Some(payload) = line.strip_prefix(PREFIX_DOWNLINK_DATA.as_bytes()) {
        LineEvent::Downlink(payload)
    } else {
        LineEvent::Other(line)
    }
}

/// Session tracker for one AT-command LoRa modem.
///
/// `M` is the modem serial port, `O` the operator console. Both only need
/// the blocking `embedded-io` traits.
pub struct LoraManager<M, O, C, D> {
    modem: M,
    operator: O,
    clock: C,
    delay: D,
    config: SessionConfig,
    state: SessionState,
    modem_lines: LineFramer,
    console_lines: LineFramer,
    downlink: Option<Downlink>,
}

impl<M, O, C, D> LoraManager<M, O, C, D>
where
    M: Read + ReadReady + Write,
    O: Read + ReadReady + Write,
    C: Clock,
    D: DelayNs,
{
    pub fn new(modem: M, operator: O, clock: C, delay: D, config: SessionConfig) -> Self {
        let state = SessionState::new(clock.now_ms());
        Self {
            modem,
            operator,
            clock,
            delay,
            config,
            state,
            modem_lines: LineFramer::new(),
            console_lines: LineFramer::new(),
            downlink: None,
        }
    }

    /// Reset the modem. It rejoins on its own and reports `JOINED`.
    pub fn begin(&mut self) -> Result<(), LinkError> {
        log::info!("{} node starting, resetting modem", board::NODE_NAME);
        self.write_command(CMD_RESET.as_bytes())
    }

    /// One service cycle: uplink window check, pending downlink fetch, then
    /// drain whatever the modem has printed.
    ///
    /// Returns true when a new uplink window opened this cycle.
    pub fn poll(&mut self) -> Result<bool, LinkError> {
        let now = self.clock.now_ms();
        let mut window_open = false;
        if self.state.joined
            && now.saturating_sub(self.state.last_uplink_at) >= self.config.uplink_interval_ms
        {
            self.state.last_uplink_at = now;
            self.state.downlink_fetched = false;
            window_open = true;
            log::info!("LoRa network is joined and ready to send data");
        }

        if self.state.downlink_available {
            self.delay.delay_ms(self.config.downlink_settle_ms);
            // Flags only move once the modem took the command; a failed
            // write retries next cycle.
            self.write_command(CMD_FETCH_DOWNLINK.as_bytes())?;
            self.state.downlink_available = false;
            self.state.downlink_fetched = true;
        }

        self.drain_modem()?;
        Ok(window_open)
    }

    fn drain_modem(&mut self) -> Result<(), LinkError> {
        let mut chunk = [0u8; 32];
        while self.modem.read_ready().map_err(LinkError::io)? {
            let n = self.modem.read(&mut chunk).map_err(LinkError::io)?;
            if n == 0 {
                break;
            }
            for &byte in &chunk[..n] {
                if let Some(frame) = self.modem_lines.feed(byte) {
                    handle_frame(frame, &mut self.state, &mut self.downlink, &mut self.operator)?;
                }
            }
        }
        Ok(())
    }

    /// Forward complete console lines to the modem so an operator can type
    /// AT commands by hand.
    pub fn relay_operator(&mut self) -> Result<(), LinkError> {
        let mut chunk = [0u8; 32];
        while self.operator.read_ready().map_err(LinkError::io)? {
            let n = self.operator.read(&mut chunk).map_err(LinkError::io)?;
            if n == 0 {
                break;
            }
            for &byte in &chunk[..n] {
                match self.console_lines.feed(byte) {
                    Some(Frame::Line(line)) => {
                        self.modem.write_all(line).map_err(LinkError::io)?;
                        self.modem.write_all(LINE_ENDING).map_err(LinkError::io)?;
                    }
                    // The tail follows as its own record, so the modem still
                    // sees one unbroken line.
                    Some(Frame::Truncated(part)) => {
                        self.modem.write_all(part).map_err(LinkError::io)?;
                    }
                    None => {}
                }
            }
        }
        Ok(())
    }

    /// Queue one measurement record as `AT+SENDB`.
    ///
    /// Returns `Ok(false)` without touching the modem while unjoined.
    pub fn send(&mut self, record: &MeasurementRecord) -> Result<bool, LinkError> {
        if !self.state.joined {
            log::warn!("Network not joined, cannot send data");
            return Ok(false);
        }
        let command = record.to_command();
        log::info!("Sending {} uplink: {}", record.kind().as_str(), command.as_str());
        self.write_command(command.as_bytes())?;
        Ok(true)
    }

    fn write_command(&mut self, command: &[u8]) -> Result<(), LinkError> {
        self.modem.write_all(command).map_err(LinkError::io)?;
        self.modem.write_all(LINE_ENDING).map_err(LinkError::io)?;
        self.modem.flush().map_err(LinkError::io)
    }

    /// The most recent downlink payload, once.
    pub fn take_downlink(&mut self) -> Option<Downlink> {
        self.downlink.take()
    }

    pub fn is_joined(&self) -> bool {
        self.state.joined
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn modem_mut(&mut self) -> &mut M {
        &mut self.modem
    }

    pub fn operator_mut(&mut self) -> &mut O {
        &mut self.operator
    }
}

fn handle_frame<O: Write>(
    frame: Frame<'_>,
    state: &mut SessionState,
    downlink: &mut Option<Downlink>,
    operator: &mut O,
) -> Result<(), LinkError> {
    let line = match frame {
        Frame::Line(line) => line,
        Frame::Truncated(part) => {
            // Never a status line; pass it through untouched
            if !state.downlink_fetched {
                operator.write_all(part).map_err(LinkError::io)?;
            }
            return Ok(());
        }
    };

    match classify_line(line) {
        LineEvent::DownlinkNotice => {
            state.downlink_available = true;
            return Ok(());
        }
        LineEvent::Downlink(payload) => {
            log::info!(
                "Get downlink data(FPort & Payload) {}",
                core::str::from_utf8(payload).unwrap_or("<binary>")
            );
            *downlink = Vec::from_slice(payload).ok();
            return Ok(());
        }
        LineEvent::Joined => {
            state.joined = true;
            log::info!("Network joined!");
        }
        LineEvent::Reset => {
            state.joined = false;
            log::warn!("Network connection reset");
        }
        LineEvent::Other(_) => {}
    }

    if !state.downlink_fetched {
        operator.write_all(line).map_err(LinkError::io)?;
        operator.write_all(LINE_ENDING).map_err(LinkError::io)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::payload::ParkingState;
    use embedded_io::ErrorKind;
    use std::collections::VecDeque;

    /// In-memory serial port: `rx` is what the far end sent, `tx` what we
    /// wrote. Writes fail while `broken` is set.
    #[derive(Default)]
    struct MockSerial {
        rx: VecDeque<u8>,
        tx: std::vec::Vec<u8>,
        broken: bool,
    }

    impl MockSerial {
        fn inject(&mut self, bytes: &[u8]) {
            self.rx.extend(bytes.iter().copied());
        }

        fn take_tx(&mut self) -> std::string::String {
            let out = std::string::String::from_utf8_lossy(&self.tx).into_owned();
            self.tx.clear();
            out
        }
    }

    impl embedded_io::ErrorType for MockSerial {
        type Error = ErrorKind;
    }

    impl Read for MockSerial {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
            let mut n = 0;
            while n < buf.len() {
                match self.rx.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    impl ReadReady for MockSerial {
        fn read_ready(&mut self) -> Result<bool, ErrorKind> {
            Ok(!self.rx.is_empty())
        }
    }

    impl Write for MockSerial {
        fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
            if self.broken {
                return Err(ErrorKind::BrokenPipe);
            }
            self.tx.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), ErrorKind> {
            Ok(())
        }
    }

    type TestManager<'a> = LoraManager<MockSerial, MockSerial, &'a ManualClock, &'a ManualClock>;

    fn manager(clock: &ManualClock) -> TestManager<'_> {
        LoraManager::new(
            MockSerial::default(),
            MockSerial::default(),
            clock,
            clock,
            SessionConfig::new(),
        )
    }

    fn joined(clock: &ManualClock) -> TestManager<'_> {
        let mut lora = manager(clock);
        lora.modem_mut().inject(b"JOINED\r\n");
        lora.poll().unwrap();
        assert!(lora.is_joined());
        lora.operator_mut().take_tx();
        lora
    }

    // ── Classification ──────────────────────────────────────────────

    #[test]
    fn classify_prefixes() {
        assert_eq!(classify_line(b"JOINED"), LineEvent::Joined);
        assert_eq!(classify_line(b"Dragino LA66 Device v1.2"), LineEvent::Reset);
        assert_eq!(
            classify_line(b"Run AT+RECVB=? to see detail"),
            LineEvent::DownlinkNotice
        );
        assert_eq!(classify_line(b"AT+RECVB=2:0A0B"), LineEvent::Downlink(b"2:0A0B"));
        assert_eq!(classify_line(b"rxDone"), LineEvent::Other(b"rxDone"));
        // Exact prefix, case-sensitive
        assert_eq!(classify_line(b"JOIN"), LineEvent::Other(b"JOIN"));
        assert_eq!(classify_line(b"joined"), LineEvent::Other(b"joined"));
    }

    // ── Join / reset ────────────────────────────────────────────────

    #[test]
    fn begin_resets_modem() {
        let clock = ManualClock::new();
        let mut lora = manager(&clock);
        lora.begin().unwrap();
        assert_eq!(lora.modem_mut().take_tx(), "ATZ\r\n");
        assert!(!lora.is_joined());
    }

    #[test]
    fn join_and_reset_banner_toggle_session() {
        let clock = ManualClock::new();
        let mut lora = joined(&clock);
        lora.modem_mut().inject(b"Dragino LA66 Device\r\n");
        lora.poll().unwrap();
        assert!(!lora.is_joined());
        // Status lines are still echoed to the operator
        assert_eq!(lora.operator_mut().take_tx(), "Dragino LA66 Device\r\n");
    }

    #[test]
    fn status_line_split_across_polls() {
        let clock = ManualClock::new();
        let mut lora = manager(&clock);
        lora.modem_mut().inject(b"JOI");
        lora.poll().unwrap();
        assert!(!lora.is_joined());
        lora.modem_mut().inject(b"NED\n");
        lora.poll().unwrap();
        assert!(lora.is_joined());
    }

    // ── Uplink window ───────────────────────────────────────────────

    #[test]
    fn uplink_window_needs_join() {
        let clock = ManualClock::new();
        let mut lora = manager(&clock);
        clock.advance(10_000);
        assert!(!lora.poll().unwrap());
    }

    #[test]
    fn uplink_window_opens_every_interval() {
        let clock = ManualClock::new();
        let mut lora = joined(&clock);
        clock.set(9_999);
        assert!(!lora.poll().unwrap());
        clock.set(10_000);
        assert!(lora.poll().unwrap());
        assert_eq!(lora.state().last_uplink_at, 10_000);
        assert!(!lora.poll().unwrap());
        clock.set(20_500);
        assert!(lora.poll().unwrap());
    }

    // ── Sending ─────────────────────────────────────────────────────

    #[test]
    fn send_while_unjoined_is_noop() {
        let clock = ManualClock::new();
        let mut lora = manager(&clock);
        let record = MeasurementRecord::Parking {
            occupancy_secs: 0,
            state: ParkingState::Free,
        };
        assert_eq!(lora.send(&record), Ok(false));
        assert!(lora.modem_mut().take_tx().is_empty());
    }

    #[test]
    fn send_writes_terminated_command() {
        let clock = ManualClock::new();
        let mut lora = joined(&clock);
        let record = MeasurementRecord::Parking {
            occupancy_secs: 90,
            state: ParkingState::Occupied,
        };
        assert_eq!(lora.send(&record), Ok(true));
        assert_eq!(lora.modem_mut().take_tx(), "AT+SENDB=1,2,3,005A01\r\n");
    }

    // ── Downlink ────────────────────────────────────────────────────

    #[test]
    fn downlink_notice_triggers_settled_fetch() {
        let clock = ManualClock::new();
        let mut lora = joined(&clock);

        lora.modem_mut().inject(b"Run AT+RECVB=? to see detail\r\n");
        lora.poll().unwrap();
        assert!(lora.state().downlink_available);
        assert!(lora.operator_mut().take_tx().is_empty());
        assert!(lora.modem_mut().take_tx().is_empty());

        // Next cycle: 1 s settle, then AT+CFG
        let before = clock.now_ms();
        lora.poll().unwrap();
        assert_eq!(clock.now_ms() - before, 1_000);
        assert_eq!(lora.modem_mut().take_tx(), "AT+CFG\r\n");
        assert!(!lora.state().downlink_available);
        assert!(lora.state().downlink_fetched);

        // Config dump and payload are swallowed
        lora.modem_mut().inject(b"AT+RECVB=2:0102\r\nAT+DEUI=00 11\r\nOK\r\n");
        lora.poll().unwrap();
        assert!(lora.operator_mut().take_tx().is_empty());
        assert_eq!(lora.take_downlink().as_deref(), Some(&b"2:0102"[..]));
        assert_eq!(lora.take_downlink(), None);
    }

    #[test]
    fn failed_fetch_write_keeps_downlink_pending() {
        let clock = ManualClock::new();
        let mut lora = joined(&clock);
        lora.modem_mut().inject(b"Run AT+RECVB=? to see detail\r\n");
        lora.poll().unwrap();

        lora.modem_mut().broken = true;
        assert_eq!(lora.poll(), Err(LinkError::Io(ErrorKind::BrokenPipe)));
        assert!(lora.state().downlink_available);
        assert!(!lora.state().downlink_fetched);

        lora.modem_mut().broken = false;
        lora.poll().unwrap();
        assert_eq!(lora.modem_mut().take_tx(), "AT+CFG\r\n");
        assert!(!lora.state().downlink_available);
        assert!(lora.state().downlink_fetched);
    }

    #[test]
    fn echo_resumes_after_next_uplink_window() {
        let clock = ManualClock::new();
        let mut lora = joined(&clock);
        lora.modem_mut().inject(b"Run AT+RECVB=? to see detail\r\n");
        lora.poll().unwrap();
        lora.poll().unwrap();
        lora.modem_mut().inject(b"OK\r\n");
        lora.poll().unwrap();
        assert!(lora.operator_mut().take_tx().is_empty());

        clock.set(20_000);
        lora.modem_mut().inject(b"TX ok\r\n");
        assert!(lora.poll().unwrap());
        assert!(!lora.state().downlink_fetched);
        assert_eq!(lora.operator_mut().take_tx(), "TX ok\r\n");
    }

    // ── Echo / passthrough ──────────────────────────────────────────

    #[test]
    fn unrecognized_lines_are_echoed() {
        let clock = ManualClock::new();
        let mut lora = manager(&clock);
        lora.modem_mut().inject(b"rxDone\r\nrssi=-80\r\n");
        lora.poll().unwrap();
        assert_eq!(lora.operator_mut().take_tx(), "rxDone\r\nrssi=-80\r\n");
    }

    #[test]
    fn long_modem_line_is_passed_through_in_pieces() {
        let clock = ManualClock::new();
        let mut lora = manager(&clock);
        let long = [b'x'; 200];
        lora.modem_mut().inject(&long);
        lora.modem_mut().inject(b"\r\n");
        lora.poll().unwrap();
        let echoed = lora.operator_mut().take_tx();
        assert_eq!(echoed.len(), 202);
        assert!(echoed.ends_with("x\r\n"));
    }

    #[test]
    fn operator_lines_reach_the_modem() {
        let clock = ManualClock::new();
        let mut lora = manager(&clock);
        lora.operator_mut().inject(b"AT+VER\rAT+DEVEUI=?\n");
        lora.relay_operator().unwrap();
        assert_eq!(lora.modem_mut().take_tx(), "AT+VER\r\nAT+DEVEUI=?\r\n");
    }
}
