use crate::domain::availability::{NewAvailabilityRule, NewBlockPeriod};
use crate::domain::meeting::{ConfirmingParty, MeetingOutcome, MeetingRequest};
use crate::domain::time_window::{parse_time, SlotRange, TimeWindow};
use crate::domain::waitlist::{LeadScoring, WaitlistCandidate};
use crate::errors::ServerError;
use crate::responses::{json_response, ok_json, ResultResp};
use crate::scheduling::{BookingQuery, Scheduler};
use astra::Request;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateBody {
    salesperson_id: i64,
    date: NaiveDate,
    start: String,
    end: String,
    city: Option<String>,
    channel: Option<String>,
    exclude_meeting_id: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleBody {
    salesperson_id: i64,
    client_id: i64,
    date: NaiveDate,
    start: String,
    end: String,
    city: Option<String>,
    channel: Option<String>,
}

#[derive(Deserialize)]
struct ConfirmBody {
    party: ConfirmingParty,
}

#[derive(Deserialize)]
struct RescheduleBody {
    date: NaiveDate,
    start: String,
    end: String,
}

#[derive(Deserialize)]
struct CompleteBody {
    outcome: MeetingOutcome,
    notes: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleBody {
    day_of_week: u8,
    start: String,
    end: String,
    city: Option<String>,
    channel: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockBody {
    date_start: NaiveDate,
    date_end: Option<NaiveDate>,
    start: Option<String>,
    end: Option<String>,
    reason: Option<String>,
}

/// A daily window over a date range; `dateEnd` defaults to `dateStart`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotBody {
    date_start: NaiveDate,
    date_end: Option<NaiveDate>,
    start: String,
    end: String,
}

impl SlotBody {
    fn slot(&self) -> Result<SlotRange, ServerError> {
        Ok(SlotRange::new(
            self.date_start,
            self.date_end.unwrap_or(self.date_start),
            parse_time(&self.start)?,
            parse_time(&self.end)?,
        )?)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HoldBody {
    resource_id: i64,
    holder_id: i64,
    ttl_minutes: Option<i64>,
    #[serde(flatten)]
    slot: SlotBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConvertBody {
    booking_id: i64,
}

/// Either an explicit `score`, or the lead data the stock scoring uses.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WaitlistBody {
    resource_id: i64,
    score: Option<f64>,
    #[serde(flatten)]
    candidate: WaitlistCandidate,
    #[serde(flatten)]
    slot: SlotBody,
}

pub fn handle(req: Request, app: &Scheduler) -> ResultResp {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let query = parse_query(&req);
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    debug!(%method, %path, "request");

    match (method.as_str(), segments.as_slice()) {
        ("GET", ["health"]) => ok_json(&json!({ "status": "ok" })),

        ("POST", ["bookings", "validate"]) => {
            let body: ValidateBody = read_json(req)?;
            let check = app.validate_booking(&BookingQuery {
                salesperson_id: body.salesperson_id,
                date: body.date,
                start_minute: parse_time(&body.start)?,
                end_minute: parse_time(&body.end)?,
                city: body.city,
                channel: body.channel,
                exclude_meeting_id: body.exclude_meeting_id,
            })?;
            ok_json(&check)
        }

        // Meetings
        ("POST", ["meetings"]) => {
            let body: ScheduleBody = read_json(req)?;
            let meeting = app.schedule_meeting(&MeetingRequest {
                salesperson_id: body.salesperson_id,
                client_id: body.client_id,
                window: TimeWindow::parse(body.date, &body.start, &body.end)?,
                city: body.city,
                channel: body.channel,
            })?;
            json_response(201, &meeting)
        }
        ("GET", ["meetings", id]) => ok_json(&app.get_meeting(parse_id(id)?)?),
        ("POST", ["meetings", id, "confirm"]) => {
            let body: ConfirmBody = read_json(req)?;
            ok_json(&app.confirm_meeting(parse_id(id)?, body.party)?)
        }
        ("POST", ["meetings", id, "reschedule"]) => {
            let body: RescheduleBody = read_json(req)?;
            let meeting = app.reschedule_meeting(
                parse_id(id)?,
                body.date,
                parse_time(&body.start)?,
                parse_time(&body.end)?,
            )?;
            ok_json(&meeting)
        }
        ("POST", ["meetings", id, "cancel"]) => ok_json(&app.cancel_meeting(parse_id(id)?)?),
        ("POST", ["meetings", id, "complete"]) => {
            let body: CompleteBody = read_json(req)?;
            ok_json(&app.complete_meeting(parse_id(id)?, body.outcome, body.notes)?)
        }

        // Salesperson calendar
        ("GET", ["salespeople", id, "agenda"]) => {
            let date = required_date(&query, "date")?;
            ok_json(&app.agenda(parse_id(id)?, date)?)
        }
        ("GET", ["salespeople", id, "free-slots"]) => {
            let date = required_date(&query, "date")?;
            let duration = parse_num(&query, "duration", 60)?;
            let step = parse_num(&query, "step", 30)?;
            let slots = app.free_slots(
                parse_id(id)?,
                date,
                duration,
                step,
                query.get("city").map(String::as_str),
                query.get("channel").map(String::as_str),
            )?;
            ok_json(&slots)
        }
        ("GET", ["salespeople", id, "rules"]) => ok_json(&app.list_rules(parse_id(id)?)?),
        ("POST", ["salespeople", id, "rules"]) => {
            let salesperson_id = parse_id(id)?;
            let body: RuleBody = read_json(req)?;
            let rule = app.create_rule(&NewAvailabilityRule {
                salesperson_id,
                day_of_week: body.day_of_week,
                start_minute: parse_time(&body.start)?,
                end_minute: parse_time(&body.end)?,
                city: body.city,
                channel: body.channel,
            })?;
            json_response(201, &rule)
        }
        ("POST", ["rules", id, "deactivate"]) => ok_json(&app.deactivate_rule(parse_id(id)?)?),
        ("GET", ["salespeople", id, "blocks"]) => ok_json(&app.list_blocks(parse_id(id)?)?),
        ("POST", ["salespeople", id, "blocks"]) => {
            let salesperson_id = parse_id(id)?;
            let body: BlockBody = read_json(req)?;
            let block = app.create_block(&NewBlockPeriod {
                salesperson_id,
                date_start: body.date_start,
                date_end: body.date_end.unwrap_or(body.date_start),
                time_start: body.start.as_deref().map(parse_time).transpose()?,
                time_end: body.end.as_deref().map(parse_time).transpose()?,
                reason: body.reason,
            })?;
            json_response(201, &block)
        }
        ("POST", ["blocks", id, "deactivate"]) => ok_json(&app.deactivate_block(parse_id(id)?)?),

        // Holds
        ("POST", ["holds"]) => {
            let body: HoldBody = read_json(req)?;
            let hold =
                app.create_hold(body.resource_id, body.slot.slot()?, body.holder_id, body.ttl_minutes)?;
            json_response(201, &hold)
        }
        ("POST", ["holds", "sweep"]) => ok_json(&app.sweep_expired()?),
        ("GET", ["holds", id]) => ok_json(&app.get_hold(parse_id(id)?)?),
        ("POST", ["holds", id, "release"]) => ok_json(&app.release_hold(parse_id(id)?)?),
        ("POST", ["holds", id, "convert"]) => {
            let body: ConvertBody = read_json(req)?;
            ok_json(&app.convert_hold(parse_id(id)?, body.booking_id)?)
        }
        ("GET", ["resources", id, "holds"]) => ok_json(&app.list_holds(parse_id(id)?)?),

        // Waitlist
        ("POST", ["waitlist"]) => {
            let body: WaitlistBody = read_json(req)?;
            let slot = body.slot.slot()?;
            let entry = match body.score {
                Some(score) => app.enqueue_waitlist(
                    body.resource_id,
                    slot,
                    body.candidate.requester_id,
                    score,
                )?,
                None => app.enqueue_scored(
                    body.resource_id,
                    slot,
                    &body.candidate,
                    &LeadScoring::default(),
                )?,
            };
            json_response(201, &entry)
        }
        ("GET", ["waitlist", id, "position"]) => {
            let entry_id = parse_id(id)?;
            let position = app.waitlist_position(entry_id)?;
            ok_json(&json!({ "entryId": entry_id, "position": position }))
        }
        ("POST", ["waitlist", id, "withdraw"]) => {
            let entry_id = parse_id(id)?;
            app.withdraw_waitlist(entry_id)?;
            ok_json(&json!({ "entryId": entry_id, "withdrawn": true }))
        }
        ("GET", ["resources", id, "waitlist"]) => ok_json(&app.list_waitlist(parse_id(id)?)?),

        _ => Err(ServerError::NotFound),
    }
}

fn read_json<T: DeserializeOwned>(req: Request) -> Result<T, ServerError> {
    let mut body = req.into_body();
    Ok(serde_json::from_reader(body.reader())?)
}

fn parse_id(raw: &str) -> Result<i64, ServerError> {
    raw.parse()
        .map_err(|_| ServerError::BadRequest(format!("invalid id {raw:?}")))
}

fn required_date(query: &HashMap<String, String>, key: &str) -> Result<NaiveDate, ServerError> {
    let raw = query
        .get(key)
        .ok_or_else(|| ServerError::BadRequest(format!("missing query parameter {key}")))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ServerError::BadRequest(format!("{key} must be YYYY-MM-DD, got {raw:?}")))
}

fn parse_num(query: &HashMap<String, String>, key: &str, default: i32) -> Result<i32, ServerError> {
    match query.get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ServerError::BadRequest(format!("{key} must be a number, got {raw:?}"))),
        None => Ok(default),
    }
}

fn parse_query(req: &Request) -> HashMap<String, String> {
    let mut map = HashMap::new();

    if let Some(q) = req.uri().query() {
        for pair in q.split('&') {
            let mut parts = pair.splitn(2, '=');
            if let (Some(k), Some(v)) = (parts.next(), parts.next()) {
                map.insert(k.to_string(), v.replace('+', " "));
            }
        }
    }

    map
}
