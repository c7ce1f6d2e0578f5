//! Progress bars of a batch of downloads.
//!
//! The main bar counts files; each running file gets a child bar counting
//! its bytes, fed by every chunk task of that file.
//!
//! ```rust
//! use shardload::progress::{ProgressDisplay, StyleOptions};
//!
//! let display = ProgressDisplay::new(StyleOptions::default(), 1, true);
//! let bar = display.file_bar("movie.mp4", 1024, 512);
//! bar.inc(512);
//! display.finish_file(bar);
//! display.finish();
//! ```

use crate::progress::StyleOptions;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use std::fmt;

/// Coordinates the main bar and the per-file bars.
pub struct ProgressDisplay {
    multi: MultiProgress,
    main: ProgressBar,
    style_options: StyleOptions,
    show_main_progress: bool,
}

impl fmt::Debug for ProgressDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressDisplay")
            .field("style_options", &self.style_options)
            .field("show_main_progress", &self.show_main_progress)
            .finish()
    }
}

impl ProgressDisplay {
    /// Create a display for `total_downloads` files.
    ///
    /// With `single_file_progress`, a batch of one file shows only its
    /// file bar.
    pub fn new(
        style_options: StyleOptions,
        total_downloads: usize,
        single_file_progress: bool,
    ) -> Self {
        let multi = if style_options.is_enabled() {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let show_main_progress = !single_file_progress || total_downloads > 1;
        let main = if show_main_progress {
            let main = multi.add(
                style_options
                    .main()
                    .clone()
                    .to_progress_bar(total_downloads as u64),
            );
            main.tick();
            main
        } else {
            ProgressBar::hidden()
        };

        Self {
            multi,
            main,
            style_options,
            show_main_progress,
        }
    }

    /// The bar counting finished files.
    pub fn main(&self) -> &ProgressBar {
        &self.main
    }

    /// Add the byte bar of one file.
    ///
    /// `resumed` bytes, already on disk from a previous run, are shown as
    /// done from the start.
    pub fn file_bar(&self, name: &str, size: u64, resumed: u64) -> ProgressBar {
        self.multi.add(
            self.style_options
                .child()
                .clone()
                .to_progress_bar(size)
                .with_position(resumed)
                .with_message(name.to_string()),
        )
    }

    /// Finish a file bar and count the file on the main bar.
    pub fn finish_file(&self, bar: ProgressBar) {
        if self.style_options.child().clear {
            bar.finish_and_clear();
        } else {
            bar.finish();
        }
        self.main.inc(1);
    }

    /// Finish the main bar once every file is done.
    pub fn finish(&self) {
        if !self.show_main_progress {
            return;
        }
        if self.style_options.main().clear {
            self.main.finish_and_clear();
        } else {
            self.main.finish();
        }
    }
}
