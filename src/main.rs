use iced::widget::{
    button, column, container, horizontal_space, image as img, row, scrollable, text, text_input,
};
use iced::{event, window, Element, Event, Length, Size, Subscription, Task, Theme};
use std::path::PathBuf;

mod document;
mod renderer;
mod viewport;

use document::PdfDocument;
use renderer::PdfRenderer;
use viewport::{FitMode, Viewport};

const WINDOW_WIDTH: f32 = 800.0;
const WINDOW_HEIGHT: f32 = 600.0;
const WINDOW_PADDING: f32 = 10.0;
// Vertical space taken up by the toolbar, the status bar and the spacing
// around the canvas; subtracted from the window height for fit-to-height.
const CANVAS_CHROME_HEIGHT: f32 = 90.0;

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter("paperview=debug,info")
        .init();

    iced::application(PdfViewer::title, PdfViewer::update, PdfViewer::view)
        .theme(|_| Theme::Dark)
        .subscription(PdfViewer::subscription)
        .window_size(Size::new(WINDOW_WIDTH, WINDOW_HEIGHT))
        .run_with(PdfViewer::new)
}

#[derive(Debug, Clone)]
enum Message {
    OpenFile,
    FileSelected(Option<PathBuf>),
    Exit,
    PreviousPage,
    NextPage,
    PageInputChanged(String),
    PageInputSubmitted,
    ZoomIn,
    ZoomOut,
    RotateClockwise,
    RotateCounterclockwise,
    FitWidth,
    FitHeight,
    WindowResized(Size),
}

struct Session {
    document: PdfDocument,
    viewport: Viewport,
}

struct PdfViewer {
    renderer: Option<PdfRenderer>,
    session: Option<Session>,
    rendered: Option<img::Handle>,
    page_input: String,
    status: String,
    window_size: Size,
}

impl PdfViewer {
    fn new() -> (Self, Task<Message>) {
        (
            Self {
                renderer: None,
                session: None,
                rendered: None,
                page_input: String::new(),
                status: String::from("Ready"),
                window_size: Size::new(WINDOW_WIDTH, WINDOW_HEIGHT),
            },
            Task::none(),
        )
    }

    fn title(&self) -> String {
        match &self.session {
            Some(session) => format!("{} - PDF Viewer", session.document.file_name()),
            None => String::from("PDF Viewer"),
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        event::listen_with(|event, _status, _window| match event {
            Event::Window(window::Event::Resized(size)) => Some(Message::WindowResized(size)),
            _ => None,
        })
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::OpenFile => {
                return Task::perform(
                    async {
                        rfd::AsyncFileDialog::new()
                            .add_filter("PDF files", &["pdf"])
                            .pick_file()
                            .await
                            .map(|handle| handle.path().to_path_buf())
                    },
                    Message::FileSelected,
                );
            }
            Message::FileSelected(Some(path)) => self.open_document(path),
            Message::FileSelected(None) => {}
            Message::Exit => return iced::exit(),
            Message::PreviousPage => {
                if self
                    .session
                    .as_mut()
                    .is_some_and(|session| session.viewport.previous_page())
                {
                    self.refresh();
                }
            }
            Message::NextPage => {
                if self
                    .session
                    .as_mut()
                    .is_some_and(|session| session.viewport.next_page())
                {
                    self.refresh();
                }
            }
            Message::PageInputChanged(input) => self.page_input = input,
            Message::PageInputSubmitted => {
                let accepted = self
                    .session
                    .as_mut()
                    .is_some_and(|session| session.viewport.set_page_entry(&self.page_input));

                if accepted {
                    self.refresh();
                } else if let Some(session) = &self.session {
                    // Invalid entry: put the current page number back.
                    self.page_input = session.viewport.page_number().to_string();
                } else {
                    self.page_input.clear();
                }
            }
            Message::ZoomIn => self.update_viewport(Viewport::zoom_in),
            Message::ZoomOut => self.update_viewport(Viewport::zoom_out),
            Message::RotateClockwise => self.rotate_current_page(90),
            Message::RotateCounterclockwise => self.rotate_current_page(-90),
            Message::FitWidth => self.update_viewport(Viewport::toggle_fit_width),
            Message::FitHeight => self.update_viewport(Viewport::toggle_fit_height),
            Message::WindowResized(size) => {
                self.window_size = size;
                if self
                    .session
                    .as_ref()
                    .is_some_and(|session| session.viewport.fit_mode() != FitMode::None)
                {
                    self.refresh();
                }
            }
        }
        Task::none()
    }

    fn open_document(&mut self, path: PathBuf) {
        if self.renderer.is_none() {
            match PdfRenderer::new() {
                Ok(renderer) => self.renderer = Some(renderer),
                Err(e) => {
                    tracing::error!("failed to bind PDFium: {e}");
                    self.status = e.to_string();
                    return;
                }
            }
        }
        let Some(renderer) = &self.renderer else {
            return;
        };

        match renderer.open_document(&path) {
            Ok(source) => {
                let document = PdfDocument::new(path, source);
                let viewport = Viewport::new(document.page_count());
                self.session = Some(Session { document, viewport });
                self.refresh();
            }
            Err(e) => {
                tracing::error!("failed to open document: {e}");
                self.status = e.to_string();
            }
        }
    }

    fn update_viewport(&mut self, mutate: impl FnOnce(&mut Viewport)) {
        let Some(session) = &mut self.session else {
            return;
        };
        mutate(&mut session.viewport);
        self.refresh();
    }

    fn rotate_current_page(&mut self, delta_degrees: i32) {
        let Some(session) = &mut self.session else {
            return;
        };
        let page_index = session.viewport.current_page();
        if let Err(e) = session.document.rotate_page(page_index, delta_degrees) {
            tracing::error!("failed to rotate page {}: {:#}", page_index, e);
        }
        self.refresh();
    }

    /// The render step: rasterize the current page at the effective zoom,
    /// swap the canvas image and recompute the status bar. The previous
    /// image handle is dropped on replacement.
    fn refresh(&mut self) {
        let canvas_size = self.canvas_size();
        let Some(session) = &mut self.session else {
            self.rendered = None;
            self.status = String::from("Ready");
            return;
        };

        let page_index = session.viewport.current_page();
        let zoom = match session.document.page_size(page_index) {
            Ok(page_size) => session.viewport.effective_zoom(page_size, canvas_size),
            Err(e) => {
                tracing::warn!("could not read page size: {:#}", e);
                session.viewport.zoom()
            }
        };

        self.rendered = session.document.render_page(page_index, zoom);
        self.status = session.viewport.status_line();
        self.page_input = session.viewport.page_number().to_string();
    }

    fn canvas_size(&self) -> (f32, f32) {
        (
            self.window_size.width - 2.0 * WINDOW_PADDING,
            self.window_size.height - 2.0 * WINDOW_PADDING - CANVAS_CHROME_HEIGHT,
        )
    }

    fn view(&self) -> Element<Message> {
        let canvas: Element<Message> = if self.session.is_some() {
            match &self.rendered {
                Some(handle) => scrollable(container(img(handle.clone()).width(Length::Shrink)))
                    .width(Length::Fill)
                    .height(Length::Fill)
                    .into(),
                None => container(text("Unable to render this page"))
                    .width(Length::Fill)
                    .height(Length::Fill)
                    .center_x(Length::Fill)
                    .center_y(Length::Fill)
                    .into(),
            }
        } else {
            // Welcome screen
            container(
                column![
                    text("PDF Viewer").size(32),
                    text("Open a PDF document to get started").size(16),
                    button("Open PDF").on_press(Message::OpenFile)
                ]
                .spacing(20)
                .align_x(iced::Alignment::Center),
            )
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
        };

        let status_bar = container(text(self.status.as_str()).size(14)).width(Length::Fill);

        column![self.toolbar(), canvas, status_bar]
            .spacing(10)
            .padding(WINDOW_PADDING)
            .into()
    }

    fn toolbar(&self) -> Element<Message> {
        let viewport = self.session.as_ref().map(|session| &session.viewport);

        let page_count = viewport.map_or(0, Viewport::page_count);
        let has_previous = viewport.is_some_and(|v| v.page_number() > 1);
        let has_next = viewport.is_some_and(|v| v.page_number() < page_count);
        let loaded = viewport.is_some();

        let zoom_percent = viewport.map_or(100, |v| (v.zoom() * 100.0).round() as i32);
        let fit_width_active = viewport.is_some_and(|v| v.fit_mode() == FitMode::Width);
        let fit_height_active = viewport.is_some_and(|v| v.fit_mode() == FitMode::Height);

        row![
            button("Open").on_press(Message::OpenFile),
            button("Exit").on_press(Message::Exit),
            horizontal_space(),
            button("Previous").on_press_maybe(has_previous.then_some(Message::PreviousPage)),
            text("Page:"),
            text_input("1", &self.page_input)
                .on_input(Message::PageInputChanged)
                .on_submit(Message::PageInputSubmitted)
                .width(50),
            text(format!("/ {page_count}")),
            button("Next").on_press_maybe(has_next.then_some(Message::NextPage)),
            horizontal_space(),
            button("Zoom Out").on_press_maybe(loaded.then_some(Message::ZoomOut)),
            text(format!("{zoom_percent}%")),
            button("Zoom In").on_press_maybe(loaded.then_some(Message::ZoomIn)),
            button("Rotate Counterclockwise")
                .on_press_maybe(loaded.then_some(Message::RotateCounterclockwise)),
            button("Rotate Clockwise").on_press_maybe(loaded.then_some(Message::RotateClockwise)),
            button("Fit Width")
                .on_press_maybe(loaded.then_some(Message::FitWidth))
                .style(if fit_width_active {
                    button::primary
                } else {
                    button::secondary
                }),
            button("Fit Height")
                .on_press_maybe(loaded.then_some(Message::FitHeight))
                .style(if fit_height_active {
                    button::primary
                } else {
                    button::secondary
                }),
        ]
        .spacing(5)
        .align_y(iced::Alignment::Center)
        .into()
    }
}
