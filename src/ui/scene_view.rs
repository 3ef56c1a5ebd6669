use std::{sync::Arc, time::Instant};

use gpui::{
    AnyElement, Context, ExternalPaths, InteractiveElement, IntoElement, ObjectFit, ParentElement,
    PathPromptOptions, Render, RenderImage, SharedString, Styled, StyledImage, Window, div, img,
    px, rgb, rgba,
};
use gpui_component::{
    button::{Button, ButtonVariants},
    h_flex, v_flex,
};

use super::{AppView, render_util::frame_to_image};
use crate::{
    pipeline::{RecognizerMessage, skeleton},
    scene::photo::spawn_photo_loader,
    types::RecognizedFrame,
};

const PREVIEW_WIDTH: f32 = 200.0;
const PREVIEW_HEIGHT: f32 = 150.0;

impl AppView {
    /// Applies every queued recognizer message in arrival order.
    fn drain_recognizer(&mut self, now: Instant) -> Option<RecognizedFrame> {
        let rx = self.msg_rx.take()?;
        let mut latest = None;
        let mut failed = false;
        while let Ok(message) = rx.try_recv() {
            match message {
                RecognizerMessage::Download(event) => self.status.on_download(&event),
                RecognizerMessage::Ready => self.status.on_ready(),
                RecognizerMessage::Recognized(recognized) => {
                    let gesture = recognized.gesture();
                    let palm = recognized.hand.as_ref().map(|hand| hand.palm);
                    if let Some(notice) = self.scene.handle_gesture(gesture, palm) {
                        log::info!("{}", notice.message());
                        self.status.on_notice(&notice, now);
                    }
                    self.status.on_reading(gesture, self.scene.state(), now);
                    latest = Some(recognized);
                }
                RecognizerMessage::Failed(err) => {
                    log::error!("hand tracking stopped: {err}");
                    self.status.on_error(&err);
                    failed = true;
                    break;
                }
            }
        }
        if failed {
            // no more inference this session; the scene keeps animating
            self.camera = None;
        } else {
            self.msg_rx = Some(rx);
        }
        latest
    }

    fn drain_photos(&mut self, now: Instant) {
        while let Ok(photo) = self.photo_rx.try_recv() {
            let name = photo.name.clone();
            self.scene.add_photo(photo);
            self.status
                .on_photo_added(&name, self.scene.photos().len(), now);
        }
    }

    fn open_photo_picker(&mut self, cx: &mut Context<'_, Self>) {
        let picked = cx.prompt_for_paths(PathPromptOptions {
            files: true,
            directories: false,
            multiple: true,
            prompt: None,
        });
        let tx = self.photo_tx.clone();
        let max_side = self.photo_max_side;
        cx.spawn(async move |_, _| match picked.await {
            Ok(Ok(Some(paths))) => {
                spawn_photo_loader(paths, max_side, tx);
            }
            Ok(Ok(None)) => {}
            Ok(Err(err)) => log::warn!("photo picker failed: {err:?}"),
            Err(_) => log::debug!("photo picker closed"),
        })
        .detach();
    }

    fn replace_image(
        slot: &mut Option<Arc<RenderImage>>,
        new_image: Arc<RenderImage>,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        if let Some(old_image) = slot.replace(new_image) {
            // GPU textures stay in the sprite atlas until dropped explicitly
            cx.drop_image(old_image, Some(window));
        }
    }

    fn render_status_bar(&self, cx: &mut Context<'_, Self>) -> AnyElement {
        let dot = div()
            .size(px(10.0))
            .rounded_full()
            .bg(rgb(self.status.level().color()));

        h_flex()
            .w_full()
            .h(px(48.0))
            .px_4()
            .gap_3()
            .items_center()
            .bg(rgb(0x0f1419))
            .child(dot)
            .child(
                div()
                    .flex_1()
                    .text_sm()
                    .text_color(rgb(0xe2e8f0))
                    .overflow_hidden()
                    .text_ellipsis()
                    .whitespace_nowrap()
                    .child(SharedString::from(self.status.text().to_string())),
            )
            .child(
                div()
                    .text_xs()
                    .text_color(rgb(0x8b95a5))
                    .child(format!("{} photos", self.scene.photos().len())),
            )
            .child(
                Button::new("add-photos")
                    .outline()
                    .label("Add photos")
                    .on_click(cx.listener(|this, _, _, cx| this.open_photo_picker(cx))),
            )
            .child(
                Button::new("fullscreen")
                    .outline()
                    .label("Fullscreen")
                    .on_click(cx.listener(|_, _, window, _| window.toggle_fullscreen())),
            )
            .into_any_element()
    }

    fn render_preview(&self) -> Option<AnyElement> {
        let image = self.preview_image.as_ref()?;
        Some(
            div()
                .absolute()
                .top(px(16.0))
                .right(px(16.0))
                .w(px(PREVIEW_WIDTH))
                .h(px(PREVIEW_HEIGHT))
                .overflow_hidden()
                .rounded_lg()
                .border_1()
                .border_color(rgba(0xffffff33))
                .bg(rgb(0x000000))
                .child(
                    img(image.clone())
                        .size_full()
                        .object_fit(ObjectFit::Contain),
                )
                .into_any_element(),
        )
    }
}

impl Render for AppView {
    fn render(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) -> impl IntoElement {
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        let now = Instant::now();
        if let Some(recognized) = self.drain_recognizer(now) {
            let preview = skeleton::preview_frame(&recognized);
            if let Some(image) = frame_to_image(preview) {
                Self::replace_image(&mut self.preview_image, image, window, cx);
            }
        }
        self.drain_photos(now);
        self.status.tick(now);

        self.scene.update(self.started.elapsed().as_secs_f32());
        let frame = self.renderer.render(&self.scene);
        if let Some(image) = frame_to_image(frame) {
            Self::replace_image(&mut self.scene_image, image, window, cx);
        }

        let scene_view: AnyElement = match &self.scene_image {
            Some(image) => img(image.clone())
                .size_full()
                .object_fit(ObjectFit::Cover)
                .into_any_element(),
            None => div().size_full().into_any_element(),
        };

        let mut stage = div()
            .relative()
            .flex_1()
            .w_full()
            .overflow_hidden()
            .bg(rgb(0x02040a))
            .child(scene_view);
        if let Some(preview) = self.render_preview() {
            stage = stage.child(preview);
        }

        v_flex()
            .size_full()
            .on_drop(cx.listener(|this, paths: &ExternalPaths, _, _| {
                this.load_photos(paths.paths().to_vec());
            }))
            .child(stage)
            .child(self.render_status_bar(cx))
    }
}
