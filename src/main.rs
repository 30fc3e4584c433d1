use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;

use octagon_oracle::config::AppConfig;
use octagon_oracle::feed;
use octagon_oracle::gemini::GeminiProvider;
use octagon_oracle::ledger::BetLedger;
use octagon_oracle::state::{
    AppState, AppStatus, BetField, Delta, PredictionState, ProviderCommand, apply_delta,
};
use octagon_oracle::ui;

struct App {
    state: AppState,
    ledger: BetLedger,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
}

impl App {
    fn new(ledger: BetLedger, cmd_tx: Option<mpsc::Sender<ProviderCommand>>) -> Self {
        Self {
            state: AppState::new(),
            ledger,
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.bet_form_open() {
            self.on_form_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('p') | KeyCode::Enter => self.request_prediction(),
            KeyCode::Char('b') => {
                if self.state.status == AppStatus::Idle && !self.state.open_bet_form() {
                    self.state.push_log("[INFO] A bet is already logged for this bout");
                }
            }
            KeyCode::Char('x') => {
                self.state.clear_selected_bet(&mut self.ledger);
            }
            KeyCode::Char('r') | KeyCode::Char('R') => self.reload(),
            _ => {}
        }
    }

    fn on_form_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.state.cancel_bet_form(),
            KeyCode::Enter => {
                self.state.submit_bet_form(&mut self.ledger);
            }
            KeyCode::Left | KeyCode::Right => self.state.toggle_bet_corner(),
            KeyCode::Tab | KeyCode::Down => {
                if let Some(form) = self.state.bet_form_mut() {
                    form.next_field();
                }
            }
            KeyCode::BackTab | KeyCode::Up => {
                if let Some(form) = self.state.bet_form_mut() {
                    form.prev_field();
                }
            }
            KeyCode::Backspace => {
                if let Some(form) = self.state.bet_form_mut() {
                    form.backspace();
                }
            }
            KeyCode::Char(' ')
                if self
                    .state
                    .bet_form()
                    .is_some_and(|f| f.focus == BetField::Fighter) =>
            {
                self.state.toggle_bet_corner();
            }
            KeyCode::Char(ch) => {
                if let Some(form) = self.state.bet_form_mut() {
                    form.push_char(ch);
                }
            }
            _ => {}
        }
    }

    /// Full reload: every card is dropped and the loader runs again.
    fn reload(&mut self) {
        let generation = self.state.begin_reload();
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log("[INFO] Fight card fetch unavailable");
            return;
        };
        if tx
            .send(ProviderCommand::FetchFightCard { generation })
            .is_err()
        {
            apply_delta(
                &mut self.state,
                &self.ledger,
                Delta::FightsFailed {
                    generation,
                    error: "provider worker stopped".to_string(),
                },
            );
        } else {
            self.state.push_log("[INFO] Fight card request sent");
        }
    }

    fn request_prediction(&mut self) {
        let Some(cmd) = self.state.request_prediction() else {
            if let Some(card) = self.state.selected_card() {
                if matches!(card.prediction, PredictionState::Predicted(_)) {
                    self.state
                        .push_log("[INFO] Analysis already generated for this bout");
                }
            }
            return;
        };
        let ProviderCommand::FetchPrediction { fight, seq } = &cmd else {
            return;
        };
        let failed = Delta::PredictionFailed {
            fight_id: fight.id.clone(),
            seq: *seq,
            error: "provider worker stopped".to_string(),
        };
        let sent = self
            .cmd_tx
            .as_ref()
            .is_some_and(|tx| tx.send(cmd.clone()).is_ok());
        if !sent {
            apply_delta(&mut self.state, &self.ledger, failed);
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = AppConfig::from_env();
    let ledger = config.open_ledger().context("open bet ledger")?;
    let provider = GeminiProvider::new(&config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    feed::spawn_provider(Arc::new(provider), tx, cmd_rx);

    let mut app = App::new(ledger, Some(cmd_tx));
    if config.api_key.is_none() {
        app.state
            .push_log("[WARN] GEMINI_API_KEY is not set; requests will fail");
    }
    app.reload();
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, &app.ledger, delta);
        }

        terminal.draw(|f| ui::draw(f, &app.state))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
