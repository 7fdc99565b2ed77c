use crate::api::CourseApi;
use crate::error::ApiError;
use crate::filter::DurationBucket;
use crate::profile::Profile;
use crate::session::{SessionState, SessionStore};
use crate::token;
use crate::views::{self, Carousel, Catalog};
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;

pub struct Context {
    pub api: Box<dyn CourseApi>,
    pub session: RefCell<SessionStore>,
    pub catalog: RefCell<Catalog>,
    pub carousel: RefCell<Carousel>,
    pub history_path: Option<PathBuf>,
}

impl Context {
    pub fn new(api: Box<dyn CourseApi>, session: SessionStore) -> Self {
        Self {
            api,
            session: RefCell::new(session),
            catalog: RefCell::new(Catalog::default()),
            carousel: RefCell::new(Carousel::default()),
            history_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Run each command in order, then return.
pub fn run_once(ctx: &Context, commands: &[String]) -> Result<()> {
    run_commands(ctx, commands, &mut std::io::stdout())
}

/// Execute `commands` in order, stopping early at `/exit`.
fn run_commands(ctx: &Context, commands: &[String], out: &mut dyn Write) -> Result<()> {
    for command in commands {
        if execute(ctx, command, out)? == Flow::Exit {
            tracing::debug!("exit requested, skipping remaining commands");
            break;
        }
    }
    Ok(())
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    if let Some(path) = &ctx.history_path {
        let _ = rl.load_history(path);
    }
    let mut out = std::io::stdout();

    println!("courseguide - personalized course recommendations");
    println!("Type /help for commands, /exit to quit");
    greet(&ctx, &mut out)?;

    loop {
        match rl.readline(">>> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if !carries_password(line) {
                    rl.add_history_entry(line)?;
                }

                match execute(&ctx, line, &mut out) {
                    Ok(Flow::Exit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    if let Some(path) = &ctx.history_path {
        if let Err(e) = rl.save_history(path) {
            tracing::warn!("could not save history to {}: {}", path.display(), e);
        }
    }

    Ok(())
}

/// Sign-in lines are kept out of the history file. The command word is
/// taken the way [`execute`] sees it, after shell-style unquoting.
fn carries_password(line: &str) -> bool {
    let first = match shell_words::split(line) {
        Ok(words) => words.into_iter().next(),
        Err(_) => line.split_whitespace().next().map(|w| w.trim_matches(['"', '\'']).to_string()),
    };
    matches!(
        first.as_deref(),
        Some("/signin" | "/login" | "/register" | "/signup")
    )
}

fn greet(ctx: &Context, out: &mut dyn Write) -> Result<()> {
    match ctx.session.borrow().state() {
        SessionState::Authenticated(session) => {
            let who = session.name.as_deref().unwrap_or(&session.email);
            writeln!(out, "Welcome back, {}. Try /dashboard or /courses.", who)?;
        }
        SessionState::Anonymous => {
            writeln!(
                out,
                "Sign in with /signin <email> <password> or create an account with /register <email> <password>."
            )?;
        }
    }
    Ok(())
}

/// Execute one command line, writing its output to `out`.
///
/// Backend and input errors are reported inline; only I/O failures on `out`
/// and session-slot failures are returned as errors.
pub fn execute(ctx: &Context, line: &str, out: &mut dyn Write) -> Result<Flow> {
    let words = match shell_words::split(line) {
        Ok(words) => words,
        Err(e) => {
            writeln!(out, "Could not parse command: {}", e)?;
            return Ok(Flow::Continue);
        }
    };
    let Some((cmd, args)) = words.split_first() else {
        return Ok(Flow::Continue);
    };
    tracing::debug!(command = %cmd, "executing");

    match cmd.as_str() {
        "/exit" | "/quit" => return Ok(Flow::Exit),
        "/help" => help(out)?,
        "/signin" | "/login" => sign_in(ctx, args, out, false)?,
        "/register" | "/signup" => sign_in(ctx, args, out, true)?,
        "/signout" | "/logout" => {
            ctx.session.borrow_mut().sign_out()?;
            ctx.catalog.borrow_mut().clear();
            ctx.carousel.borrow_mut().clear();
            writeln!(out, "Signed out.")?;
        }
        "/session" => session_info(ctx, out)?,
        "/profile" => show_profile(ctx, out)?,
        "/setup" => setup_profile(ctx, args, out)?,
        "/dashboard" => dashboard(ctx, out)?,
        "/next" | "/prev" => {
            let mut carousel = ctx.carousel.borrow_mut();
            let moved = if cmd == "/next" {
                carousel.next().is_some()
            } else {
                carousel.prev().is_some()
            };
            if moved {
                write_card(&carousel, out)?;
            } else {
                writeln!(out, "No recommendations loaded. Open /dashboard first.")?;
            }
        }
        "/feedback" => feedback(ctx, &args.join(" "), out)?,
        "/courses" => courses(ctx, out)?,
        "/search" => {
            ctx.catalog.borrow_mut().criteria.search_term = args.join(" ");
            refresh_listing(ctx, out)?;
        }
        "/level" => {
            if args.is_empty() {
                ctx.catalog.borrow_mut().criteria.level = None;
                refresh_listing(ctx, out)?;
            } else {
                let input = args.join(" ");
                match views::canonical_level(&input) {
                    Some(level) => {
                        ctx.catalog.borrow_mut().criteria.level = Some(level.to_string());
                        refresh_listing(ctx, out)?;
                    }
                    None => writeln!(
                        out,
                        "Unknown level '{}'. Choose one of: {}",
                        input,
                        views::LEVELS.join(", ")
                    )?,
                }
            }
        }
        "/rating" => match args.first().map(|a| a.parse::<f64>()) {
            None => {
                ctx.catalog.borrow_mut().criteria.min_rating = None;
                refresh_listing(ctx, out)?;
            }
            Some(Ok(r)) if (0.0..=views::MAX_RATING).contains(&r) => {
                ctx.catalog.borrow_mut().criteria.min_rating = Some(r);
                refresh_listing(ctx, out)?;
            }
            Some(_) => writeln!(
                out,
                "Minimum rating must be a number from 0 to {}",
                views::MAX_RATING
            )?,
        },
        "/duration" => match args.first() {
            None => {
                ctx.catalog.borrow_mut().criteria.duration = None;
                refresh_listing(ctx, out)?;
            }
            Some(arg) => match DurationBucket::from_str(arg) {
                Some(bucket) => {
                    ctx.catalog.borrow_mut().criteria.duration = Some(bucket);
                    refresh_listing(ctx, out)?;
                }
                None => writeln!(
                    out,
                    "Unknown duration '{}'. Choose one of: {}",
                    arg,
                    views::duration_choices()
                )?,
            },
        },
        "/topic" => {
            if args.is_empty() {
                writeln!(out, "Usage: /topic <name>  (see /topics)")?;
            } else {
                ctx.catalog.borrow_mut().criteria.toggle_topic(&args.join(" "));
                refresh_listing(ctx, out)?;
            }
        }
        "/topics" => write!(out, "{}", views::topic_choices(&ctx.catalog.borrow()))?,
        "/reset" => {
            ctx.catalog.borrow_mut().criteria.reset();
            refresh_listing(ctx, out)?;
        }
        "/course" => match args.first() {
            Some(id) => course_details(ctx, id, out)?,
            None => writeln!(out, "Usage: /course <id>")?,
        },
        other => writeln!(out, "Unknown command: {}. Type /help for commands.", other)?,
    }

    Ok(Flow::Continue)
}

fn help(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "Account:")?;
    writeln!(out, "  /signin <email> <password>   - sign in")?;
    writeln!(out, "  /register <email> <password> - create an account")?;
    writeln!(out, "  /signout                     - sign out")?;
    writeln!(out, "  /session                     - show session info")?;
    writeln!(out, "Profile:")?;
    writeln!(out, "  /profile                     - show your profile")?;
    writeln!(out, "  /setup key=value ...         - update profile fields")?;
    writeln!(out, "      fields: {}", crate::profile::FIELDS.join(", "))?;
    writeln!(out, "Dashboard:")?;
    writeln!(out, "  /dashboard                   - show your top recommendation")?;
    writeln!(out, "  /next, /prev                 - browse recommendations")?;
    writeln!(out, "  /feedback <text>             - send feedback")?;
    writeln!(out, "Courses:")?;
    writeln!(out, "  /courses                     - list recommended courses")?;
    writeln!(out, "  /search [term]               - search title, topics, instructor")?;
    writeln!(out, "  /level [{}]", views::LEVELS.join("|"))?;
    writeln!(out, "  /rating [0-{}]                - minimum rating", views::MAX_RATING)?;
    writeln!(out, "  /duration [{}]", views::duration_choices())?;
    writeln!(out, "  /topic <name>                - toggle a topic filter")?;
    writeln!(out, "  /topics                      - list available topics")?;
    writeln!(out, "  /reset                       - clear all filters")?;
    writeln!(out, "  /course <id>                 - course details")?;
    writeln!(out, "  /help, /exit")?;
    Ok(())
}

/// Run `call` with the current token.
///
/// Prints a sign-in prompt when anonymous. A 401 from the backend signs the
/// user out; any other failure is printed. Returns `None` in all of those
/// cases.
fn with_token<T>(
    ctx: &Context,
    out: &mut dyn Write,
    call: impl FnOnce(&str) -> Result<T, ApiError>,
) -> Result<Option<T>> {
    let token = match ctx.session.borrow().current() {
        Some(session) => session.token.clone(),
        None => {
            writeln!(out, "Please sign in first: /signin <email> <password>")?;
            return Ok(None);
        }
    };

    match call(&token) {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_unauthorized() => {
            ctx.session.borrow_mut().unauthorized()?;
            ctx.catalog.borrow_mut().clear();
            ctx.carousel.borrow_mut().clear();
            writeln!(out, "Your session has expired. Please sign in again.")?;
            writeln!(out, "Sign in with /signin <email> <password>")?;
            Ok(None)
        }
        Err(err) => {
            tracing::debug!(status = ?err.status(), "request failed: {}", err);
            writeln!(out, "Error: {}", err)?;
            Ok(None)
        }
    }
}

fn sign_in(ctx: &Context, args: &[String], out: &mut dyn Write, register: bool) -> Result<()> {
    let usage = if register {
        "Usage: /register <email> <password>"
    } else {
        "Usage: /signin <email> <password>"
    };
    let (email, password) = match args {
        [email, password] if !email.trim().is_empty() && !password.is_empty() => {
            (email.trim(), password.as_str())
        }
        _ => {
            writeln!(out, "{}", usage)?;
            return Ok(());
        }
    };

    let result = if register {
        ctx.api.register(email, password)
    } else {
        ctx.api.login(email, password)
    };
    let session = match result {
        Ok(session) => session,
        Err(err) => {
            writeln!(out, "Error: {}", err)?;
            return Ok(());
        }
    };

    let who = session.name.clone().unwrap_or_else(|| session.email.clone());
    ctx.catalog.borrow_mut().clear();
    ctx.carousel.borrow_mut().clear();
    ctx.session.borrow_mut().sign_in(session)?;

    if register {
        writeln!(out, "Account created for {}.", who)?;
        writeln!(
            out,
            "Tell us about yourself to get recommendations: /setup career_goals=\"...\" skills=\"...\" interests=\"...\""
        )?;
        Ok(())
    } else {
        writeln!(out, "Signed in as {}.", who)?;
        dashboard(ctx, out)
    }
}

fn session_info(ctx: &Context, out: &mut dyn Write) -> Result<()> {
    match ctx.session.borrow().current() {
        Some(session) => {
            writeln!(out, "Signed in as {} (account {})", session.email, session.id)?;
            if let Some(name) = &session.name {
                writeln!(out, "Name: {}", name)?;
            }
            match token::expires_at(&session.token) {
                Some(at) => writeln!(out, "Token expires: {}", at.to_rfc3339())?,
                None => writeln!(out, "Token expiry: unknown")?,
            }
        }
        None => writeln!(out, "Not signed in.")?,
    }
    Ok(())
}

fn show_profile(ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let Some(profile) = with_token(ctx, out, |t| ctx.api.get_profile(t))? else {
        return Ok(());
    };
    let session = ctx.session.borrow();
    if let Some(session) = session.current() {
        write!(out, "{}", views::profile_view(&profile, &session.email, &session.id))?;
    }
    Ok(())
}

fn setup_profile(ctx: &Context, args: &[String], out: &mut dyn Write) -> Result<()> {
    let profile = match Profile::from_assignments(args) {
        Ok(profile) => profile,
        Err(message) => {
            writeln!(out, "{}", message)?;
            return Ok(());
        }
    };
    if profile.is_empty() {
        writeln!(
            out,
            "Nothing to save. Usage: /setup career_goals=\"...\" skills=\"...\" interests=\"...\""
        )?;
        return Ok(());
    }

    let Some(ack) = with_token(ctx, out, |t| ctx.api.save_profile(t, &profile))? else {
        return Ok(());
    };
    writeln!(
        out,
        "{}",
        ack.message
            .as_deref()
            .unwrap_or("Profile updated successfully!")
    )?;

    if profile.touches_recommendation_inputs() {
        ctx.catalog.borrow_mut().clear();
        ctx.carousel.borrow_mut().clear();
        writeln!(out, "Your recommendations have been refreshed. See /dashboard.")?;
    }
    Ok(())
}

fn write_card(carousel: &Carousel, out: &mut dyn Write) -> Result<()> {
    if let Some(course) = carousel.current() {
        write!(
            out,
            "{}",
            views::course_card(course, carousel.position(), carousel.len())
        )?;
    }
    Ok(())
}

fn dashboard(ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let Some(courses) = with_token(ctx, out, |t| ctx.api.recommendations(t))? else {
        return Ok(());
    };

    let mut carousel = ctx.carousel.borrow_mut();
    carousel.load(courses);
    if carousel.is_empty() {
        writeln!(
            out,
            "No recommendations yet. Describe your goals with /setup to get some."
        )?;
        return Ok(());
    }
    writeln!(out, "Your top recommendations:")?;
    write_card(&carousel, out)?;
    writeln!(out, "Use /next and /prev to browse, /courses for the full list.")?;
    Ok(())
}

fn feedback(ctx: &Context, text: &str, out: &mut dyn Write) -> Result<()> {
    if text.trim().is_empty() {
        writeln!(out, "Usage: /feedback <text>")?;
        return Ok(());
    }
    if with_token(ctx, out, |t| ctx.api.submit_feedback(t, text))?.is_some() {
        writeln!(out, "Thank you for your feedback!")?;
    }
    Ok(())
}

fn courses(ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let Some(courses) = with_token(ctx, out, |t| ctx.api.recommendations(t))? else {
        return Ok(());
    };
    ctx.catalog.borrow_mut().load(courses);
    write!(out, "{}", views::catalog_listing(&ctx.catalog.borrow()))?;
    Ok(())
}

/// Re-render the catalog after a criteria change.
fn refresh_listing(ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let catalog = ctx.catalog.borrow();
    if catalog.is_loaded() {
        write!(out, "{}", views::catalog_listing(&catalog))?;
    } else {
        match views::criteria_summary(&catalog.criteria) {
            Some(summary) => writeln!(out, "Filters: {}. Run /courses to see results.", summary)?,
            None => writeln!(out, "Filters cleared.")?,
        }
    }
    Ok(())
}

fn course_details(ctx: &Context, id: &str, out: &mut dyn Write) -> Result<()> {
    if let Some(course) = with_token(ctx, out, |t| ctx.api.course_details(t, id))? {
        write!(out, "{}", views::course_details(&course))?;
    }
    Ok(())
}
