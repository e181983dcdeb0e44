//! Terminal rendition of the list detail page with the reveal interaction.

use std::io::Write;

use client_core::{
    reveal::{rank_fragment, ScrollRequest},
    RevealController,
};
use shared::domain::RankedList;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use url::Url;

use crate::render;

const HELP: &str = "enter: reveal next | a: toggle show all | <rank>: link to entry | q: quit";

pub struct RevealView<'a> {
    list: &'a RankedList,
    page_url: Url,
    controller: RevealController,
    pending_scroll: Option<ScrollRequest>,
}

impl<'a> RevealView<'a> {
    /// `page_url` is the public page of the list; its fragment is the deep link.
    pub fn open(list: &'a RankedList, page_url: Url) -> Self {
        let (controller, pending_scroll) =
            RevealController::from_url(list.entries.len(), &page_url);
        Self {
            list,
            page_url,
            controller,
            pending_scroll,
        }
    }

    pub fn controller(&self) -> &RevealController {
        &self.controller
    }

    pub fn toggle_show_all(&mut self) {
        self.controller.toggle_show_all();
    }

    pub fn render(&self) -> String {
        let highlighted = self.pending_scroll.as_ref().map(|scroll| scroll.rank);
        let mut out = format!("{}\n", self.list.title);
        if let Some(subtitle) = &self.list.subtitle {
            out.push_str(&format!("{subtitle}\n"));
        }
        out.push_str(&format!("\n{}\n\n", self.list.intro.trim_end()));
        for entry in self.controller.visible(&self.list.entries) {
            out.push_str(&render::entry_card(entry, Some(entry.rank) == highlighted));
        }
        out.push_str(&self.footer());
        out
    }

    fn footer(&self) -> String {
        let mut out = String::new();
        if !self.controller.is_show_all() {
            out.push_str(&format!(
                "\n{} ({:.0}%)\n",
                self.controller.status_line(),
                self.controller.progress() * 100.0
            ));
        }
        if let Some(label) = self.controller.reveal_button_label() {
            out.push_str(&format!("next: {label}\n"));
        }
        if self.controller.is_show_all() || !self.controller.can_reveal_next() {
            if let Some(outro) = &self.list.outro {
                out.push_str(&format!("\n{}\n", outro.trim_end()));
            }
        }
        out
    }

    /// Show-all mode has nothing left to reveal.
    fn reveal_next(&mut self) -> Option<ScrollRequest> {
        self.controller.reveal_button_label()?;
        self.controller.reveal_next()
    }

    fn entry_link(&self, rank: u32) -> Url {
        let replace = self.controller.select_entry(rank);
        let mut url = self.page_url.clone();
        url.set_fragment(Some(replace.fragment.trim_start_matches('#')));
        url
    }

    /// Reads commands line by line until `q` or end of input.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        if let Some(scroll) = &self.pending_scroll {
            tokio::time::sleep(scroll.delay).await;
        }
        write!(out, "{}", self.render())?;
        writeln!(out, "{HELP}")?;
        self.pending_scroll = None;

        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let command = line.trim();
            match command {
                "q" | "quit" => break,
                "" | "n" | "next" => match self.reveal_next() {
                    Some(scroll) => {
                        let index = scroll.rank as usize - 1;
                        if let Some(entry) = self.list.entries.get(index) {
                            write!(out, "{}", render::entry_card(entry, true))?;
                        }
                        write!(out, "{}", self.footer())?;
                    }
                    None => writeln!(out, "Everything is revealed.")?,
                },
                "a" | "all" => {
                    self.controller.toggle_show_all();
                    write!(out, "{}", self.render())?;
                }
                _ => match command.parse::<u32>() {
                    Ok(rank) if (1..=self.list.entries.len() as u32).contains(&rank) => {
                        writeln!(out, "{}", self.entry_link(rank))?;
                    }
                    _ => writeln!(out, "{HELP}")?,
                },
            }
        }
        Ok(())
    }
}

/// Public page of a list, with `#rank-N` when a rank is requested.
pub fn list_page_url(site_url: &Url, slug: &str, rank: Option<u32>) -> anyhow::Result<Url> {
    let mut url = site_url.join(&format!("lists/{slug}"))?;
    url.set_fragment(rank.map(rank_fragment).as_deref().map(|f| f.trim_start_matches('#')));
    Ok(url)
}
