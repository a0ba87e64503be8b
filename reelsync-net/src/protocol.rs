//! Wire schema for reelsync sessions.
//!
//! Maps each line of the text protocol to a typed [`Command`] and back.
//! Every command has a fixed field list; only `Channel` (a display label)
//! and `stop` (a frame number) accept one trailing field, which is ignored.
//! `AudioVolume` is read as `Volume`.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use reelsync_types::{
    Command, EraseStroke, LoopMode, MediaRef, MediaShift, PathStroke, Playback, Point, Rect,
    TextAnnotation, Wipe,
};

use crate::framing::{encode, CodecError, Field, Fields, Token};

/// Unique identifier for a live connection within this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocate a fresh id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A decoded inbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `OK`, or an empty line.
    Ack,
    /// `Not OK`, with the peer id the sender attached, if any.
    Nack(Option<String>),
    Command(Command),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("{command}: missing {field}")]
    MissingField {
        command: String,
        field: &'static str,
    },
    #[error("{command}: invalid {field} {value:?}")]
    InvalidField {
        command: String,
        field: &'static str,
        value: String,
    },
    #[error("{command}: unexpected trailing input {rest:?}")]
    TrailingInput { command: String, rest: String },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub const OK: &[u8] = b"OK\n";

/// Negative acknowledgement naming the peer whose command was refused.
pub fn not_ok(peer: SocketAddr) -> Vec<u8> {
    format!("Not OK {}\n", peer).into_bytes()
}

/// Parse one decoded line.
pub fn parse_line(line: &str) -> Result<Message, ParseError> {
    let mut fields = Fields::new(line);
    let name = match fields.next() {
        None => return Ok(Message::Ack),
        Some(token) => token?,
    };
    let name = match name {
        Token::Bare(name) => name,
        Token::Quoted(name) => return Err(ParseError::UnknownCommand(name.into_owned())),
    };

    match name {
        "OK" => return Ok(Message::Ack),
        "Not" => {
            let mut after = fields.clone();
            if let Some(Ok(Token::Bare("OK"))) = after.next() {
                let id = after.rest();
                return Ok(Message::Nack((!id.is_empty()).then(|| id.to_string())));
            }
        }
        _ => {}
    }

    let mut reader = FieldReader {
        command: name,
        fields,
    };
    let command = parse_command(name, &mut reader)?;
    reader.finish()?;
    Ok(Message::Command(command))
}

/// Parse a line that must be a command, such as a locally typed edit.
pub fn parse_command_line(line: &str) -> Result<Command, ParseError> {
    match parse_line(line)? {
        Message::Command(command) => Ok(command),
        _ => Err(ParseError::UnknownCommand(line.trim().to_string())),
    }
}

fn parse_command(name: &str, r: &mut FieldReader<'_>) -> Result<Command, ParseError> {
    let command = match name {
        "seek" => Command::Seek(r.number("frame")?),
        "TimelineMin" => Command::TimelineMin(r.frame("frame")?),
        "TimelineMax" => Command::TimelineMax(r.frame("frame")?),
        "FPS" => Command::Fps(r.number("fps")?),
        "Looping" => {
            let mode: i64 = r.number("mode")?;
            Command::Looping(LoopMode::from_index(mode).ok_or_else(|| r.invalid("mode", mode))?)
        }
        "playfwd" => Command::Playback(Playback::Forwards),
        "playback" => Command::Playback(Playback::Backwards),
        "stop" => {
            r.skip_optional()?;
            Command::Playback(Playback::Stopped)
        }

        "Gain" => Command::Gain(r.number("gain")?),
        "Gamma" => Command::Gamma(r.number("gamma")?),
        "Channel" => {
            let index = r.number("index")?;
            r.skip_optional()?;
            Command::Channel(index)
        }
        "UseLUT" => Command::UseLut(r.flag("flag")?),
        "SafeAreas" => Command::SafeAreas(r.flag("flag")?),
        "ShowPixelRatio" => Command::ShowPixelRatio(r.flag("flag")?),
        "Normalize" => Command::Normalize(r.flag("flag")?),
        "DisplayWindow" => Command::DisplayWindow(r.flag("flag")?),
        "DataWindow" => Command::DataWindow(r.flag("flag")?),
        "Mask" => Command::Mask(r.number("mask")?),
        "Volume" | "AudioVolume" => Command::Volume(r.number("volume")?),
        "OCIOView" => Command::OcioView {
            display: r.string("display")?,
            view: r.string("view")?,
        },

        "ICS" => Command::Ics(r.string("name")?),
        "IDT" => Command::Idt(r.string("name")?),
        "LMT" => Command::Lmt {
            index: r.number("index")?,
            name: r.string("name")?,
        },
        "RT" => Command::Rt(r.string("name")?),

        "Zoom" => Command::Zoom(r.number("zoom")?),
        "Offset" => Command::Offset {
            x: r.number("x")?,
            y: r.number("y")?,
        },
        "Rotation" => Command::Rotation {
            x: r.number("x")?,
            y: r.number("y")?,
        },
        "Selection" => Command::Selection(Rect::new(
            r.number("x")?,
            r.number("y")?,
            r.number("w")?,
            r.number("h")?,
        )),

        "EDL" => Command::Edl(r.flag("flag")?),
        "CurrentReel" | "Reel" => Command::CurrentReel(r.string("name")?),
        "Image" => Command::Image(r.media()?),
        "CurrentImage" => Command::CurrentImage(r.media()?),
        "ChangeImage" => Command::ChangeImage(r.number("index")?),
        "InsertImage" => Command::InsertImage {
            index: r.number("index")?,
            path: r.string("path")?,
        },
        "RemoveImage" => Command::RemoveImage {
            index: r.number("index")?,
            path: r.string("path")?,
        },
        "ReplaceImage" => Command::ReplaceImage {
            index: r.number("index")?,
            path: r.string("path")?,
        },
        "ExchangeImage" => Command::ExchangeImage {
            from: r.number("from")?,
            to: r.number("to")?,
        },
        "CloneImage" => Command::CloneImage(r.string("path")?),
        "ShiftMediaStart" => Command::ShiftMediaStart(r.shift()?),
        "ShiftMediaEnd" => Command::ShiftMediaEnd(r.shift()?),
        "ShiftAudio" => Command::ShiftAudio(r.shift()?),

        "FGReel" => Command::FgReel(r.number("reel")?),
        "BGReel" => {
            let index: i64 = r.number("reel")?;
            Command::BgReel(usize::try_from(index).ok())
        }
        "CurrentBGImage" => Command::CurrentBgImage(r.background()?),
        "ShowBG" => Command::ShowBg(r.flag("flag")?),
        "WipeVertical" => Command::Wipe(Wipe::Vertical(r.number("amount")?)),
        "WipeHorizontal" => Command::Wipe(Wipe::Horizontal(r.number("amount")?)),
        "NoWipe" => Command::Wipe(Wipe::Off),

        "GLPathShape" => Command::PathShape(PathStroke {
            color: [
                r.number("red")?,
                r.number("green")?,
                r.number("blue")?,
                r.number("alpha")?,
            ],
            pen_size: r.number("pen size")?,
            frame: r.number("frame")?,
            points: r.points()?,
        }),
        "GLErasePathShape" => Command::ErasePathShape(EraseStroke {
            pen_size: r.number("pen size")?,
            frame: r.number("frame")?,
            points: r.points()?,
        }),
        "GLTextShape" => Command::TextShape(TextAnnotation {
            font: r.string("font")?,
            text: r.caret("text")?,
            size: r.number("font size")?,
            color: [
                r.number("red")?,
                r.number("green")?,
                r.number("blue")?,
                r.number("alpha")?,
            ],
            frame: r.number("frame")?,
            position: Point::new(r.number("x")?, r.number("y")?),
        }),
        "UndoDraw" => Command::UndoDraw,
        "RedoDraw" => Command::RedoDraw,

        "sync_image" => Command::SyncImage,

        _ => return Err(ParseError::UnknownCommand(name.to_string())),
    };
    Ok(command)
}

/// Typed access to the fields following a command name.
struct FieldReader<'a> {
    command: &'a str,
    fields: Fields<'a>,
}

impl<'a> FieldReader<'a> {
    fn next(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        Ok(self.fields.next().transpose()?)
    }

    fn token(&mut self, field: &'static str) -> Result<Token<'a>, ParseError> {
        self.next()?.ok_or_else(|| ParseError::MissingField {
            command: self.command.to_string(),
            field,
        })
    }

    fn invalid(&self, field: &'static str, value: impl ToString) -> ParseError {
        ParseError::InvalidField {
            command: self.command.to_string(),
            field,
            value: value.to_string(),
        }
    }

    fn parse<T: FromStr>(&self, field: &'static str, token: &Token<'_>) -> Result<T, ParseError> {
        token.as_str().parse().map_err(|_| self.invalid(field, token.as_str()))
    }

    fn number<T: FromStr>(&mut self, field: &'static str) -> Result<T, ParseError> {
        let token = self.token(field)?;
        self.parse(field, &token)
    }

    /// A frame number; timeline bounds may arrive as decimals and are
    /// truncated.
    fn frame(&mut self, field: &'static str) -> Result<i64, ParseError> {
        let token = self.token(field)?;
        if let Ok(frame) = token.as_str().parse() {
            return Ok(frame);
        }
        let value: f64 = self.parse(field, &token)?;
        if value.is_finite() && value.abs() < i64::MAX as f64 {
            Ok(value as i64)
        } else {
            Err(self.invalid(field, token.as_str()))
        }
    }

    fn flag(&mut self, field: &'static str) -> Result<bool, ParseError> {
        let value: i64 = self.number(field)?;
        Ok(value != 0)
    }

    /// A name or path. Quoted on the wire, but a bare word is accepted.
    fn string(&mut self, field: &'static str) -> Result<String, ParseError> {
        Ok(self.token(field)?.as_str().to_string())
    }

    fn media(&mut self) -> Result<MediaRef, ParseError> {
        Ok(MediaRef {
            path: self.string("path")?,
            first: self.number("first frame")?,
            last: self.number("last frame")?,
        })
    }

    /// An empty path clears the background and carries no frame range.
    fn background(&mut self) -> Result<Option<MediaRef>, ParseError> {
        let path = self.string("path")?;
        if path.is_empty() {
            self.skip_optional()?;
            self.skip_optional()?;
            return Ok(None);
        }
        Ok(Some(MediaRef {
            path,
            first: self.number("first frame")?,
            last: self.number("last frame")?,
        }))
    }

    fn caret(&mut self, field: &'static str) -> Result<String, ParseError> {
        match self.fields.caret() {
            Some(text) => Ok(text?.to_string()),
            None => {
                let token = self.token(field)?;
                Err(self.invalid(field, token.as_str()))
            }
        }
    }

    fn shift(&mut self) -> Result<MediaShift, ParseError> {
        Ok(MediaShift {
            reel: self.number("reel")?,
            path: self.string("path")?,
            delta: self.number("delta")?,
        })
    }

    /// All remaining fields as `x y` pairs.
    fn points(&mut self) -> Result<Vec<Point>, ParseError> {
        let mut points = Vec::new();
        while let Some(x) = self.next()? {
            let x = self.parse("x", &x)?;
            let y = self.number("y")?;
            points.push(Point::new(x, y));
        }
        Ok(points)
    }

    fn skip_optional(&mut self) -> Result<(), ParseError> {
        self.next()?;
        Ok(())
    }

    fn finish(mut self) -> Result<(), ParseError> {
        let rest = self.fields.rest();
        match self.next()? {
            None => Ok(()),
            Some(_) => Err(ParseError::TrailingInput {
                command: self.command.to_string(),
                rest: rest.to_string(),
            }),
        }
    }
}

fn flag(on: bool) -> Field<'static> {
    Field::Int(i64::from(on))
}

/// Canonical wire form of a command.
pub fn encode_command(command: &Command) -> Result<Vec<u8>, CodecError> {
    let name = command.name();
    let fields: Vec<Field<'_>> = match command {
        Command::Seek(frame) | Command::TimelineMin(frame) | Command::TimelineMax(frame) => {
            vec![Field::Int(*frame)]
        }
        Command::Fps(fps) => vec![Field::Float(*fps)],
        Command::Looping(mode) => vec![Field::Int(mode.index())],
        Command::Playback(_) => vec![],

        Command::Gain(v) | Command::Gamma(v) | Command::Mask(v) | Command::Volume(v) => {
            vec![Field::Float32(*v)]
        }
        Command::Channel(index) => vec![Field::Int(i64::from(*index))],
        Command::UseLut(on)
        | Command::SafeAreas(on)
        | Command::ShowPixelRatio(on)
        | Command::Normalize(on)
        | Command::DisplayWindow(on)
        | Command::DataWindow(on)
        | Command::Edl(on)
        | Command::ShowBg(on) => vec![flag(*on)],
        Command::OcioView { display, view } => vec![Field::Quoted(display), Field::Quoted(view)],

        Command::Ics(name) | Command::Idt(name) | Command::Rt(name) => vec![Field::Quoted(name)],
        Command::Lmt { index, name } => vec![Field::Int(*index as i64), Field::Quoted(name)],

        Command::Zoom(z) => vec![Field::Float32(*z)],
        Command::Offset { x, y } | Command::Rotation { x, y } => {
            vec![Field::Float(*x), Field::Float(*y)]
        }
        Command::Selection(rect) => vec![
            Field::Float(rect.x),
            Field::Float(rect.y),
            Field::Float(rect.w),
            Field::Float(rect.h),
        ],

        Command::CurrentReel(name) => vec![Field::Quoted(name)],
        Command::Image(media) | Command::CurrentImage(media) => vec![
            Field::Quoted(&media.path),
            Field::Int(media.first),
            Field::Int(media.last),
        ],
        Command::ChangeImage(index) => vec![Field::Int(*index as i64)],
        Command::InsertImage { index, path }
        | Command::RemoveImage { index, path }
        | Command::ReplaceImage { index, path } => {
            vec![Field::Int(*index as i64), Field::Quoted(path)]
        }
        Command::ExchangeImage { from, to } => vec![Field::Int(*from as i64), Field::Int(*to as i64)],
        Command::CloneImage(path) => vec![Field::Quoted(path)],
        Command::ShiftMediaStart(shift)
        | Command::ShiftMediaEnd(shift)
        | Command::ShiftAudio(shift) => vec![
            Field::Int(shift.reel as i64),
            Field::Quoted(&shift.path),
            Field::Int(shift.delta),
        ],

        Command::FgReel(index) => vec![Field::Int(*index as i64)],
        Command::BgReel(index) => vec![Field::Int(index.map_or(-1, |i| i as i64))],
        Command::CurrentBgImage(Some(media)) => vec![
            Field::Quoted(&media.path),
            Field::Int(media.first),
            Field::Int(media.last),
        ],
        Command::CurrentBgImage(None) => vec![Field::Quoted("")],
        Command::Wipe(wipe) => wipe.amount().map(Field::Float32).into_iter().collect(),

        Command::PathShape(stroke) => {
            let mut fields: Vec<Field<'_>> =
                stroke.color.iter().map(|c| Field::Float32(*c)).collect();
            fields.push(Field::Float32(stroke.pen_size));
            fields.push(Field::Int(stroke.frame));
            push_points(&mut fields, &stroke.points);
            fields
        }
        Command::ErasePathShape(erase) => {
            let mut fields = vec![Field::Float32(erase.pen_size), Field::Int(erase.frame)];
            push_points(&mut fields, &erase.points);
            fields
        }
        Command::TextShape(note) => {
            let mut fields = vec![
                Field::Quoted(&note.font),
                Field::Caret(&note.text),
                Field::Int(i64::from(note.size)),
            ];
            fields.extend(note.color.iter().map(|c| Field::Float32(*c)));
            fields.push(Field::Int(note.frame));
            push_points(&mut fields, std::slice::from_ref(&note.position));
            fields
        }
        Command::UndoDraw | Command::RedoDraw | Command::SyncImage => vec![],
    };
    encode(name, &fields)
}

fn push_points(fields: &mut Vec<Field<'_>>, points: &[Point]) {
    for p in points {
        fields.push(Field::Float(p.x));
        fields.push(Field::Float(p.y));
    }
}
