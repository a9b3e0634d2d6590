mod terminal;

use clap::{Args, Parser, Subcommand};
use futures::executor::block_on;
use livestyle_lib::events::PageEvent;
use livestyle_lib::layout_taffy::Viewport;
use livestyle_lib::selector::derive_selector;
use livestyle_lib::storage::FileStorage;
use livestyle_lib::tool::DEFAULT_STORAGE_KEY;
use livestyle_lib::{Collaborators, LiveStyleError, Page, ToolConfig, ToolHost};
use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use terminal::{OutputClipboard, TerminalNotifier};
use url::Url;

#[derive(Parser)]
#[command(name = "livestyle")]
#[command(about = "Pick elements of an HTML page, restyle them and keep the edits per page")]
struct Cli {
    #[command(flatten)]
    shared: SharedArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SharedArgs {
    /// Storage key the saved styles live under.
    #[arg(long, global = true, default_value = DEFAULT_STORAGE_KEY)]
    storage_key: String,

    #[arg(long, global = true, default_value_t = 1280.0)]
    viewport_width: f32,

    #[arg(long, global = true, default_value_t = 800.0)]
    viewport_height: f32,

    /// JSON file backing the style storage.
    #[arg(long, global = true, default_value = "livestyle-store.json")]
    store: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Pick the element at a point, apply edits to it and optionally save them.
    Edit {
        #[arg(long)]
        html: PathBuf,
        #[arg(long)]
        url: Url,
        #[arg(long)]
        x: f32,
        #[arg(long)]
        y: f32,
        /// New inline style; defaults to the current one.
        #[arg(long)]
        css: Option<String>,
        /// New inner markup; defaults to the current one.
        #[arg(long)]
        markup: Option<String>,
        #[arg(long)]
        save: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Apply the saved styles for a page.
    Load {
        #[arg(long)]
        html: PathBuf,
        #[arg(long)]
        url: Url,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write every saved style as transfer JSON.
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace all saved styles with transfer JSON (`-` reads stdin).
    Import {
        #[arg(long)]
        input: String,
    },
    /// Print the selector derived for the element at a point.
    Selector {
        #[arg(long)]
        html: PathBuf,
        #[arg(long, default_value = "about:blank")]
        url: Url,
        #[arg(long)]
        x: f32,
        #[arg(long)]
        y: f32,
    },
}

struct Session {
    config: ToolConfig,
    storage: Rc<FileStorage>,
}

impl Session {
    fn new(shared: &SharedArgs) -> Self {
        Session {
            config: ToolConfig {
                storage_key: shared.storage_key.clone(),
                viewport: Viewport {
                    width: shared.viewport_width,
                    height: shared.viewport_height,
                },
            },
            storage: Rc::new(FileStorage::new(&shared.store)),
        }
    }

    fn page(&self, html: &Path, url: Url) -> io::Result<Page> {
        let html_content = fs::read_to_string(html)?;
        Ok(Page::from_html(url, &html_content, self.config.viewport))
    }

    fn collaborators(&self, clipboard_path: Option<PathBuf>, answer: Option<String>) -> Collaborators {
        Collaborators {
            storage: self.storage.clone(),
            clipboard: Rc::new(OutputClipboard::new(clipboard_path)),
            notifier: Rc::new(TerminalNotifier::new(answer)),
        }
    }

    /// A host with the tool already injected.
    fn host(&self, page: Page, collaborators: Collaborators) -> Result<ToolHost, LiveStyleError> {
        let mut host = ToolHost::new(page);
        block_on(host.init(&self.config, collaborators))?;
        Ok(host)
    }
}

/// Removes the tool from the page and writes what is left.
fn write_page(mut host: ToolHost, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    host.teardown()?;
    let html = host.page().to_html();
    match output {
        Some(path) => fs::write(path, html)?,
        None => println!("{html}"),
    }
    Ok(())
}

fn read_input(input: &str) -> io::Result<String> {
    if input == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(input)
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let session = Session::new(&cli.shared);
    match cli.command {
        Command::Edit {
            html,
            url,
            x,
            y,
            css,
            markup,
            save,
            output,
        } => {
            let page = session.page(&html, url)?;
            let mut host = session.host(page, session.collaborators(None, None))?;
            host.tool()?.start_selection();
            host.dispatch(&PageEvent::PointerMove { x, y });
            host.dispatch(&PageEvent::Click { x, y });

            let tool = host.tool()?;
            let Some(picked) = tool.selected() else {
                return Err(format!("no element at ({x}, {y})").into());
            };
            log::info!("{}", tool.status());
            log::debug!("picked {}", picked.selector);
            if let Some(css) = css {
                tool.set_css_field(css);
            }
            if let Some(markup) = markup {
                tool.set_markup_field(markup);
            }
            tool.apply()?;
            if save {
                block_on(tool.save())?;
            }
            write_page(host, output.as_deref())
        }
        Command::Load { html, url, output } => {
            let page = session.page(&html, url)?;
            let mut host = session.host(page, session.collaborators(None, None))?;
            let report = block_on(host.tool()?.load())?;
            if !report.unresolved.is_empty() {
                log::warn!("unresolved selectors: {:?}", report.unresolved);
            }
            write_page(host, output.as_deref())
        }
        Command::Export { output } => {
            let page = Page::new(
                Url::parse("about:blank")?,
                livestyle_lib::dom::dom_tree::new_document(),
                session.config.viewport,
            );
            let mut host = session.host(page, session.collaborators(output, None))?;
            block_on(host.tool()?.export())?;
            Ok(())
        }
        Command::Import { input } => {
            let text = read_input(&input)?;
            let page = Page::new(
                Url::parse("about:blank")?,
                livestyle_lib::dom::dom_tree::new_document(),
                session.config.viewport,
            );
            let mut host = session.host(page, session.collaborators(None, Some(text)))?;
            block_on(host.tool()?.import())?;
            Ok(())
        }
        Command::Selector { html, url, x, y } => {
            let page = session.page(&html, url)?;
            match page.element_from_point(x, y, |_| false) {
                Some(element) => {
                    println!("{}", derive_selector(&element));
                    Ok(())
                }
                None => Err(format!("no element at ({x}, {y})").into()),
            }
        }
    }
}

fn main() {
    env_logger::init();

    // parse the args given in terminal
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        // User-facing failures were already shown as alerts.
        let already_reported = err
            .downcast_ref::<LiveStyleError>()
            .is_some_and(LiveStyleError::is_user_facing);
        if !already_reported {
            eprintln!("Error: {err}");
        }
        std::process::exit(1);
    }
}
