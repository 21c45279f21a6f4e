//! Fruit Breaker entry point
//!
//! In the browser this drives the session from `requestAnimationFrame` and
//! draws it on a 2D canvas. Natively it runs a headless autoplay demo.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::f64::consts::TAU;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use web_sys::{
        CanvasRenderingContext2d, HtmlCanvasElement, HtmlInputElement, KeyboardEvent,
        PointerEvent, TouchEvent,
    };

    use fruit_breaker::audio::web::AudioPool;
    use fruit_breaker::sim::{BrickKind, GameEvent};
    use fruit_breaker::{GamePhase, Leaderboard, PlayState, Session, Settings, Tuning};

    /// Game instance holding the session and the drawing surface
    struct Game {
        session: Session,
        ctx: CanvasRenderingContext2d,
        canvas: HtmlCanvasElement,
        last_time: f64,
    }

    fn brick_color(kind: BrickKind) -> &'static str {
        match kind {
            BrickKind::Banana => "#f7d354",
            BrickKind::Pineapple => "#f4a623",
            BrickKind::Apple => "#e74c3c",
            BrickKind::Blueberry => "#4a6fdc",
            BrickKind::Avocado => "#6aa84f",
            BrickKind::Bomb => "#333333",
            BrickKind::Gray => "#9e9e9e",
            BrickKind::Rainbow => "#c77dff",
            BrickKind::Cross => "#ff66aa",
        }
    }

    impl Game {
        /// Pointer x in canvas pixels from a client coordinate
        fn canvas_x(&self, client_x: f64) -> f32 {
            let rect = self.canvas.get_bounding_client_rect();
            if rect.width() <= 0.0 {
                return 0.0;
            }
            let logical = self.session.tuning().canvas_width as f64;
            ((client_x - rect.left()) * logical / rect.width()) as f32
        }

        fn nickname() -> String {
            web_sys::window()
                .and_then(|w| w.document())
                .and_then(|d| d.get_element_by_id("nickname"))
                .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
                .map(|input| input.value())
                .unwrap_or_default()
        }

        /// Click / Enter: whatever the current screen's main button does
        fn primary_action(&mut self) {
            let s = &mut self.session;
            let result = match s.phase() {
                GamePhase::InstagramGate => s.follow_gate(),
                GamePhase::ReadyToStart => s.start(&Self::nickname()),
                GamePhase::LevelClear => s.next_level(),
                GamePhase::GameOver => s.submit_score(js_sys::Date::now()),
                GamePhase::Ranking => s.back_to_menu(),
                GamePhase::Admin => s.close_admin(),
                GamePhase::Countdown(_) | GamePhase::Playing(_) => Ok(()),
            };
            if let Err(e) = result {
                log::debug!("Ignored action: {}", e);
            }
        }

        fn toggle_pause(&mut self) {
            let result = match self.session.phase() {
                GamePhase::Playing(PlayState::Paused) => self.session.resume(),
                _ => self.session.pause(),
            };
            if let Err(e) = result {
                log::debug!("Ignored pause: {}", e);
            }
        }

        fn update(&mut self, time: f64) {
            let elapsed = if self.last_time > 0.0 { time - self.last_time } else { 0.0 };
            self.last_time = time;
            self.session.frame(elapsed);

            for event in self.session.drain_events() {
                match event {
                    GameEvent::LevelCleared { level } => log::info!("Level {} cleared", level),
                    GameEvent::GameOver { score } => log::info!("Final score {}", score),
                    other => log::debug!("{:?}", other),
                }
            }
        }

        fn render(&self) -> Result<(), JsValue> {
            let ctx = &self.ctx;
            let tuning = self.session.tuning();
            let state = self.session.state();
            let (w, h) = (tuning.canvas_width as f64, tuning.canvas_height as f64);

            ctx.set_fill_style_str("#101522");
            ctx.fill_rect(0.0, 0.0, w, h);

            // HUD
            ctx.set_fill_style_str("#ffffff");
            ctx.set_font("16px sans-serif");
            ctx.set_text_align("left");
            ctx.fill_text(&format!("SCORE {}", state.score), 12.0, 32.0)?;
            ctx.set_text_align("right");
            ctx.fill_text(&format!("LEVEL {}", state.level), w - 12.0, 32.0)?;

            let destroying: Vec<_> = state.effects.animating_ids().collect();
            for brick in &state.bricks {
                let alpha = if brick.active {
                    1.0
                } else if destroying.contains(&brick.id)
                    || state.effects.cross_center() == Some(brick.id)
                {
                    0.35
                } else {
                    continue;
                };
                ctx.set_global_alpha(alpha);
                ctx.set_fill_style_str(brick_color(brick.kind));
                ctx.fill_rect(
                    brick.rect.x as f64,
                    brick.rect.y as f64,
                    brick.rect.width as f64,
                    brick.rect.height as f64,
                );
            }
            ctx.set_global_alpha(1.0);

            ctx.set_fill_style_str("#ffffff");
            for ball in state.balls.iter().filter(|b| b.active) {
                ctx.begin_path();
                ctx.arc(ball.pos.x as f64, ball.pos.y as f64, ball.radius as f64, 0.0, TAU)?;
                ctx.fill();
            }

            ctx.set_fill_style_str("#7fd1ff");
            ctx.fill_rect(
                state.paddle.x as f64,
                tuning.paddle_y() as f64,
                state.paddle.width as f64,
                tuning.paddle_height as f64,
            );

            self.render_overlay(w, h)
        }

        fn render_overlay(&self, w: f64, h: f64) -> Result<(), JsValue> {
            let ctx = &self.ctx;
            let phase = self.session.phase();
            let lines: Vec<String> = match phase {
                GamePhase::InstagramGate => vec!["Follow us to play".into(), "tap to continue".into()],
                GamePhase::ReadyToStart => vec!["FRUIT BREAKER".into(), "tap to start".into()],
                GamePhase::Countdown(c) | GamePhase::Playing(PlayState::Resuming(c)) => {
                    vec![c.remaining.to_string()]
                }
                GamePhase::Playing(PlayState::Paused) => vec!["PAUSED".into()],
                GamePhase::Playing(PlayState::Running) => Vec::new(),
                GamePhase::LevelClear => vec!["LEVEL CLEAR".into(), "tap for next level".into()],
                GamePhase::GameOver => vec![
                    "GAME OVER".into(),
                    format!("{} pts", self.session.score()),
                    "tap to submit".into(),
                ],
                GamePhase::Ranking => {
                    let mut lines = vec!["THIS WEEK".to_string()];
                    for (i, e) in self.session.ranking(js_sys::Date::now()).iter().enumerate() {
                        lines.push(format!("{}. {}  {}", i + 1, e.nickname, e.score));
                    }
                    lines
                }
                GamePhase::Admin => {
                    let mut lines = vec!["ADMIN".to_string()];
                    for e in self.session.admin_entries() {
                        lines.push(format!("{}  {}", e.nickname, e.score));
                    }
                    lines
                }
            };
            if lines.is_empty() {
                return Ok(());
            }

            ctx.set_fill_style_str("rgba(0, 0, 0, 0.55)");
            ctx.fill_rect(0.0, 0.0, w, h);
            ctx.set_fill_style_str("#ffffff");
            ctx.set_font("20px sans-serif");
            ctx.set_text_align("center");
            let top = h / 2.0 - lines.len() as f64 * 14.0;
            for (i, line) in lines.iter().enumerate() {
                ctx.fill_text(line, w / 2.0, top + i as f64 * 28.0)?;
            }
            Ok(())
        }
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialised".into());
        }

        log::info!("Fruit Breaker starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;
        let tuning = Tuning::default();
        canvas.set_width(tuning.canvas_width as u32);
        canvas.set_height(tuning.canvas_height as u32);
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or("no 2d context")?
            .dyn_into()?;

        let seed = js_sys::Date::now() as u64;
        let session = Session::new(
            seed,
            tuning,
            Box::new(AudioPool::new()),
            Settings::load(),
            Box::new(Leaderboard::load()),
        );
        let game = Rc::new(RefCell::new(Game {
            session,
            ctx,
            canvas: canvas.clone(),
            last_time: 0.0,
        }));
        log::info!("Session initialized with seed: {}", seed);

        setup_input_handlers(&canvas, game.clone())?;
        setup_auto_pause(game.clone())?;
        request_animation_frame(game);

        log::info!("Fruit Breaker running!");
        Ok(())
    }

    fn setup_input_handlers(
        canvas: &HtmlCanvasElement,
        game: Rc<RefCell<Game>>,
    ) -> Result<(), JsValue> {
        // Pointer move (mouse and pen); only the latest position is kept
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut g = game.borrow_mut();
                let x = g.canvas_x(event.client_x() as f64);
                g.session.pointer_move(x);
            });
            canvas.add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Touch move
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let mut g = game.borrow_mut();
                    let x = g.canvas_x(touch.client_x() as f64);
                    g.session.pointer_move(x);
                }
            });
            canvas.add_event_listener_with_callback("touchmove", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Click / tap
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: PointerEvent| {
                game.borrow_mut().primary_action();
            });
            canvas.add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Keyboard
        {
            let window = web_sys::window().ok_or("no window")?;
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                let result = match event.key().as_str() {
                    " " | "Enter" => {
                        g.primary_action();
                        Ok(())
                    }
                    "Escape" | "p" | "P" => {
                        g.toggle_pause();
                        Ok(())
                    }
                    "q" | "Q" => g.session.quit(),
                    "r" | "R" => g.session.open_ranking(),
                    "m" | "M" => g.session.open_admin(),
                    "x" | "X" => g.session.admin_reset(),
                    "s" | "S" => {
                        g.session.share();
                        Ok(())
                    }
                    "b" | "B" | "n" | "N" | "-" | "=" => {
                        let mut settings = g.session.settings().clone();
                        match event.key().as_str() {
                            "b" | "B" => settings.bgm_muted = !settings.bgm_muted,
                            "n" | "N" => settings.sfx_muted = !settings.sfx_muted,
                            "-" => settings = settings.with_bgm_volume(settings.bgm_volume - 0.05),
                            _ => settings = settings.with_bgm_volume(settings.bgm_volume + 0.05),
                        }
                        g.session.apply_settings(settings);
                        Ok(())
                    }
                    "i" | "I" => {
                        let on = !g.session.autoplay();
                        g.session.set_autoplay(on);
                        log::info!("Autoplay: {}", on);
                        Ok(())
                    }
                    _ => Ok(()),
                };
                if let Err(e) = result {
                    log::debug!("Ignored key: {}", e);
                }
            });
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();
            g.update(time);
            if let Err(e) = g.render() {
                log::warn!("Render failed: {:?}", e);
            }
        }

        request_animation_frame(game);
    }

    /// Pause when the tab is hidden
    fn setup_auto_pause(game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or("no document")?;
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                let mut g = game.borrow_mut();
                if g.session.phase() == GamePhase::Playing(PlayState::Running)
                    && g.session.pause().is_ok()
                {
                    log::info!("Auto-paused (tab hidden)");
                }
            }
        });
        document
            .add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Fruit Breaker (native) starting headless autoplay demo...");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);
    if let Err(e) = demo::run(seed) {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::time::{SystemTime, UNIX_EPOCH};

    use fruit_breaker::audio::NullAudio;
    use fruit_breaker::sim::GameEvent;
    use fruit_breaker::{BASELINE_FRAME_MS, GamePhase, Leaderboard, Session, Settings, Tuning};

    /// Ten simulated minutes
    const MAX_FRAMES: u32 = 60 * 60 * 10;

    pub fn run(seed: u64) -> fruit_breaker::Result<()> {
        let mut session = Session::new(
            seed,
            Tuning::default(),
            Box::new(NullAudio),
            Settings::default(),
            Box::new(Leaderboard::new()),
        );
        session.follow_gate()?;
        session.start("demo")?;
        session.set_autoplay(true);

        for _ in 0..MAX_FRAMES {
            session.frame(BASELINE_FRAME_MS);
            for event in session.drain_events() {
                match event {
                    GameEvent::LevelCleared { level } => log::info!("Level {} cleared", level),
                    other => log::trace!("{:?}", other),
                }
            }
            match session.phase() {
                GamePhase::LevelClear => session.next_level()?,
                GamePhase::GameOver => break,
                _ => {}
            }
        }

        println!(
            "Reached level {} with {} points",
            session.level(),
            session.score()
        );
        if session.phase() == GamePhase::GameOver {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as f64)
                .unwrap_or(0.0);
            session.submit_score(now)?;
            for (i, entry) in session.ranking(now).iter().enumerate() {
                println!("{:>2}. {:<12} {}", i + 1, entry.nickname, entry.score);
            }
        }
        log::debug!("Final snapshot: {}", session.snapshot_json()?);
        Ok(())
    }
}
