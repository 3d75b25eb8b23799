//! Command dispatch, clipboard and saving.

use chrono::Local;

use super::{DocumentWidget, RequestState};
use crate::commands::Command;
use crate::events::DocumentEvent;
use crate::layout::LinkId;
use crate::save::save_to_downloads;

impl DocumentWidget {
    /// Run a command. Returns false when the command needs a loaded page
    /// and there is none.
    pub fn handle_command(&mut self, cmd: &Command) -> bool {
        log::debug!("session {}: {cmd}", self.session.0);
        match cmd {
            Command::Reload => self.reload(),
            Command::Stop => self.stop(),
            Command::Save => self.save_page(),
            Command::NavigateBack => return self.navigate_back(),
            Command::NavigateForward => return self.navigate_forward(),
            Command::NavigateParent => self.navigate_parent(),
            Command::NavigateRoot => self.navigate_root(),
            Command::ScrollPage(n) => self.scroll_page(*n, false),
            Command::ScrollStep(n) => self.scroll_step(*n, false),
            Command::ScrollTop => self.scroll_top(),
            Command::ScrollBottom => self.scroll_bottom(),
            Command::FindNext(text) => return self.find_next(text),
            Command::FindPrev(text) => return self.find_prev(text),
            Command::FindClearMark => self.clear_found_mark(),
            Command::LinkKeys { mode, release } => {
                if self.state != RequestState::Ready {
                    return false;
                }
                self.enter_link_keys(*mode, *release);
            },
            Command::InputSubmit(value) => self.submit_input(value),
            Command::InputCancel => self.cancel_input(),
            Command::Copy => self.copy(),
            Command::CopyPageUrl => {
                let url = self.url.clone();
                self.emit(DocumentEvent::Clipboard(url));
            },
            Command::CopyPageSource => {
                let text = self.page_source();
                self.emit(DocumentEvent::Clipboard(text));
            },
            Command::CopyLink(id) => {
                let Some(url) = self.doc.link(*id).map(|l| l.url.clone()) else {
                    return false;
                };
                self.emit(DocumentEvent::Clipboard(url));
            },
            Command::OpenLink { link, mode } => self.open_link(*link, *mode),
            Command::ShowCert => {
                let summary = self.certificate_summary();
                self.emit(DocumentEvent::Message(summary));
            },
            Command::TrustCert => return self.trust_certificate(),
            Command::SaveMedia(id) => self.save_media(*id),
        }
        true
    }

    fn page_source(&self) -> String {
        if self.source_content.is_empty() {
            self.doc.source().to_string()
        } else {
            String::from_utf8_lossy(&self.source_content).into_owned()
        }
    }

    /// Copy the selection, or the whole page source when nothing is
    /// selected.
    pub fn copy(&mut self) {
        let text = match self.selection() {
            Some(sel) => sel.to_string(),
            None => self.page_source(),
        };
        self.emit(DocumentEvent::Clipboard(text));
    }

    /// Save the page content to the downloads directory.
    pub fn save_page(&mut self) {
        if self.state != RequestState::Ready || self.request.is_some() {
            self.emit(DocumentEvent::Message(
                "Page Incomplete\nThe page contents are still being downloaded.".into(),
            ));
            return;
        }
        if self.source_content.is_empty() {
            self.emit(DocumentEvent::Message(
                "Page Content Missing\nThe page contents could not be saved because there is no data."
                    .into(),
            ));
            return;
        }
        let result = save_to_downloads(
            &self.config.downloads_dir,
            &self.url,
            &self.source_mime,
            &self.source_content,
            Local::now(),
        );
        self.report_save(result);
    }

    /// Save the inline media of `link` to the downloads directory.
    pub fn save_media(&mut self, link: LinkId) {
        let (url, mime, data) = if let Some((mime, data)) = self.doc.media().data(link) {
            let url = self.doc.link(link).map(|l| l.url.clone()).unwrap_or_default();
            (url, mime.to_string(), data.to_vec())
        } else if let Some(req) = self
            .media_request_index(link)
            .map(|i| &self.media_requests[i])
            .filter(|r| r.session.is_finished())
        {
            let resp = req.session.lock_response();
            (req.url.clone(), resp.meta.clone(), resp.body.clone())
        } else {
            self.emit(DocumentEvent::Message(
                "Media Not Ready\nThe content has not finished downloading.".into(),
            ));
            return;
        };
        let result = save_to_downloads(&self.config.downloads_dir, &url, &mime, &data, Local::now());
        self.report_save(result);
    }

    fn report_save(&mut self, result: gemview_types::error::Result<crate::save::Saved>) {
        let message = match result {
            Ok(saved) => saved.message(),
            Err(e) => {
                log::error!("session {}: save failed: {e}", self.session.0);
                format!("Error Saving File\n{e}")
            },
        };
        self.emit(DocumentEvent::Message(message));
    }
}
