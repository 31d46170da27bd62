use therapist_core::{PendingTurn, Transcript, TurnHandler};

pub struct App {
    pub should_quit: bool,

    // Conversation
    pub transcript: Transcript,
    pub pending: Option<PendingTurn>,
    /// Shown in place of the reply when the last turn failed. Not part of the transcript.
    pub error: Option<String>,

    // Input box
    pub input: String,
    pub cursor: usize, // char index into input

    // Chat pane geometry, updated during render
    pub scroll: u16,
    /// Pin the view to the newest entry on the next render.
    pub follow_bottom: bool,
    pub chat_height: u16,
    pub chat_width: u16,

    pub animation_frame: u8, // 0-2 for ellipsis animation

    handler: TurnHandler,
}

impl App {
    pub fn new(handler: TurnHandler) -> Self {
        Self {
            should_quit: false,
            transcript: Transcript::new(),
            pending: None,
            error: None,
            input: String::new(),
            cursor: 0,
            scroll: 0,
            follow_bottom: true,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            handler,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn model(&self) -> &str {
        self.handler.agent().model()
    }

    /// Send the input box contents. Ignored while blank or while a reply is pending.
    pub fn submit(&mut self) {
        if self.pending.is_some() || self.input.trim().is_empty() {
            return;
        }

        let text = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.error = None;
        self.pending = Some(self.handler.begin(&mut self.transcript, text));
        self.scroll_to_bottom();
    }

    /// Fold a finished reply into the transcript. Cheap no-op otherwise.
    pub async fn poll_turn(&mut self) {
        let finished = self.pending.as_ref().is_some_and(PendingTurn::is_finished);
        if !finished {
            return;
        }
        if let Some(pending) = self.pending.take() {
            let outcome = pending.wait().await;
            if let Err(e) = self.handler.finish(&mut self.transcript, outcome) {
                self.error = Some(e.to_string());
            }
            self.animation_frame = 0;
            self.scroll_to_bottom();
        }
    }

    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.scroll = self.scroll.min(self.max_scroll()).saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.scroll = self.scroll.saturating_add(lines).min(max);
        self.follow_bottom = self.scroll == max;
    }

    /// Scroll so the newest entry (or "Thinking...") is visible. Re-applied on
    /// the next render, once the pane size is known.
    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
        self.scroll = self.max_scroll();
    }

    /// Record the chat pane's inner size and keep the scroll offset inside the content.
    pub fn set_chat_area(&mut self, width: u16, height: u16) {
        self.chat_width = width;
        self.chat_height = height;
        self.scroll = if self.follow_bottom {
            self.max_scroll()
        } else {
            self.scroll.min(self.max_scroll())
        };
    }

    fn max_scroll(&self) -> u16 {
        self.content_lines().saturating_sub(self.chat_height)
    }

    /// Estimated wrapped line count of the chat pane.
    fn content_lines(&self) -> u16 {
        // Default to 50 columns before the first render
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total: usize = 0;
        for message in self.transcript.messages() {
            total += 2 + wrapped_lines(message.content(), wrap_width); // label + blank
        }
        if let Some(error) = &self.error {
            total += 2 + wrapped_lines(error, wrap_width);
        }
        if self.is_loading() {
            total += 2;
        }
        total.min(u16::MAX as usize) as u16
    }
}

fn wrapped_lines(text: &str, width: usize) -> usize {
    text.lines()
        .map(|line| {
            let chars = line.chars().count();
            if chars == 0 {
                1
            } else {
                chars.div_ceil(width)
            }
        })
        .sum::<usize>()
        .max(1)
}
