//! SQLite-backed schedule store.
//!
//! Expects the usual timetable tables (`routes`, `trips`, `stop_times`,
//! `calendar`, `stops`, `transfers`, `shapes`) as imported from the flat
//! files, plus the `direction` and `schd_trip_id` trip columns. Columns are
//! read leniently: a bulk import typically leaves everything as text.

use std::path::Path;
use std::sync::Mutex;

use chrono::{Datelike, NaiveDate};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, Row, Rows, params, params_from_iter};
use tracing::debug;

use crate::domain::{
    Route, ScheduledTrip, ServiceCalendar, ServiceTime, ShapePoint, Stop, StopId, StopTimeEntry,
    Transfer, TripInfo, TripKey, weekday_column,
};

use super::{ActiveTrip, ScheduleStore, StoreError, TripQuery};

/// Departure time normalized to zero-padded "HH:MM:SS" so it compares as text.
const DEPARTURE: &str = "substr('0' || trim(st.departure_time), -8)";

const TRIP_COLUMNS: &str = "t.route_id, t.service_id, t.trip_id, t.direction_id, t.block_id, \
     t.shape_id, t.direction, t.wheelchair_accessible, t.schd_trip_id";

const STOP_COLUMNS: &str = "s.stop_id, s.stop_code, s.stop_name, s.stop_desc, s.stop_lat, \
     s.stop_lon, s.location_type, s.parent_station, s.wheelchair_boarding";

const ROUTE_COLUMNS: &str = "r.route_id, r.route_short_name, r.route_long_name, r.route_type, \
     r.route_url, r.route_color, r.route_text_color";

/// Schedule store over a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open an existing schedule database read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!(path = %path.display(), "opened schedule database");
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already-open connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }

    fn query_all<T>(
        &self,
        sql: &str,
        key: &str,
        table: &'static str,
        read: impl Fn(&Fields<'_, '_>) -> Result<T, StoreError>,
    ) -> Result<Vec<T>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let rows = stmt.query(params![key])?;
            collect(rows, table, read)
        })
    }

    /// `column` is `from_stop_id` or `to_stop_id`.
    fn transfers(&self, column: &'static str, stop: StopId) -> Result<Vec<Transfer>, StoreError> {
        let sql = format!(
            "SELECT from_stop_id, to_stop_id, transfer_type, min_transfer_time \
             FROM transfers WHERE {column} = ?1"
        );
        self.query_all(&sql, &stop.to_string(), "transfers", |f| {
            Ok(Transfer {
                from_stop: f.stop_id(0, "from_stop_id")?,
                to_stop: f.stop_id(1, "to_stop_id")?,
                transfer_type: f.small(2)?.unwrap_or(0),
                min_transfer_time: f.integer(3)?.and_then(|n| u32::try_from(n).ok()),
            })
        })
    }
}

/// SQL for [`ScheduleStore::active_trips`].
///
/// Parameters: ?1 key, ?2 date as YYYYMMDD, ?3 cutoff, ?4.. headsigns.
/// Only whitelisted column names are interpolated.
fn active_trips_sql(query: &TripQuery) -> String {
    let key_column = match query.key {
        TripKey::Run(_) => "t.schd_trip_id",
        TripKey::Route(_) => "t.route_id",
    };
    let day = weekday_column(query.date.weekday());

    let mut sql = format!(
        "SELECT {TRIP_COLUMNS}, \
                MIN(CASE WHEN {DEPARTURE} >= ?3 THEN {DEPARTURE} END) AS next_departure, \
                MAX({DEPARTURE}) AS last_departure \
         FROM trips t \
         JOIN stop_times st ON st.trip_id = t.trip_id \
         JOIN calendar c ON c.service_id = t.service_id \
         WHERE {key_column} = ?1 \
           AND CAST(c.start_date AS INTEGER) <= ?2 \
           AND CAST(c.end_date AS INTEGER) >= ?2 \
           AND CAST(c.{day} AS INTEGER) = 1"
    );

    if !query.headsigns.is_empty() {
        let placeholders = (0..query.headsigns.len())
            .map(|i| format!("?{}", i + 4))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(
            " AND (LOWER(TRIM(t.direction)) IN ({placeholders}) \
               OR EXISTS (SELECT 1 FROM stop_times h \
                          WHERE h.trip_id = t.trip_id \
                            AND LOWER(TRIM(h.stop_headsign)) IN ({placeholders})))"
        ));
    }

    sql.push_str(&format!(
        " GROUP BY t.trip_id \
          HAVING MAX({DEPARTURE}) >= ?3 \
          ORDER BY next_departure ASC, t.trip_id ASC"
    ));
    sql
}

fn date_number(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}

impl ScheduleStore for SqliteStore {
    fn active_trips(&self, query: &TripQuery) -> Result<Vec<ActiveTrip>, StoreError> {
        let sql = active_trips_sql(query);

        let mut values = vec![
            Value::Text(query.key.schedule_value()),
            Value::Integer(date_number(query.date)),
            Value::Text(query.cutoff.to_string()),
        ];
        values.extend(query.headsigns.iter().cloned().map(Value::Text));

        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query(params_from_iter(values))?;
            collect(rows, "trips", |f| {
                Ok(ActiveTrip {
                    trip: read_trip(f)?,
                    next_departure: f.time(9, "next_departure")?,
                    last_departure: f.time(10, "last_departure")?,
                })
            })
        })
    }

    fn route(&self, id: &str) -> Result<Option<Route>, StoreError> {
        let sql = format!("SELECT {ROUTE_COLUMNS} FROM routes r WHERE r.route_id = ?1");
        Ok(self.query_all(&sql, id, "routes", read_route)?.into_iter().next())
    }

    fn stop(&self, id: StopId) -> Result<Option<Stop>, StoreError> {
        let sql = format!("SELECT {STOP_COLUMNS} FROM stops s WHERE s.stop_id = ?1");
        Ok(self
            .query_all(&sql, &id.to_string(), "stops", read_stop)?
            .into_iter()
            .next())
    }

    fn trip(&self, trip_id: &str) -> Result<Option<ScheduledTrip>, StoreError> {
        let sql = format!("SELECT {TRIP_COLUMNS} FROM trips t WHERE t.trip_id = ?1");
        Ok(self
            .query_all(&sql, trip_id, "trips", read_trip)?
            .into_iter()
            .next())
    }

    fn stop_times(&self, trip_id: &str) -> Result<Vec<StopTimeEntry>, StoreError> {
        let sql = "SELECT trip_id, arrival_time, departure_time, stop_id, stop_sequence, \
                          stop_headsign, pickup_type, shape_dist_traveled \
                   FROM stop_times WHERE trip_id = ?1 \
                   ORDER BY CAST(stop_sequence AS INTEGER)";
        self.query_all(sql, trip_id, "stop_times", read_stop_time)
    }

    fn trip_stops(&self, trip_id: &str) -> Result<Vec<Stop>, StoreError> {
        let sql = format!(
            "SELECT {STOP_COLUMNS} FROM stop_times st \
             JOIN stops s ON s.stop_id = st.stop_id \
             WHERE st.trip_id = ?1 \
             ORDER BY CAST(st.stop_sequence AS INTEGER)"
        );
        self.query_all(&sql, trip_id, "stops", read_stop)
    }

    fn route_stops(&self, route_id: &str) -> Result<Vec<Stop>, StoreError> {
        let sql = format!(
            "SELECT DISTINCT {STOP_COLUMNS} FROM stops s \
             JOIN stop_times st ON st.stop_id = s.stop_id \
             JOIN trips t ON t.trip_id = st.trip_id \
             WHERE t.route_id = ?1 \
             ORDER BY CAST(s.stop_id AS INTEGER)"
        );
        self.query_all(&sql, route_id, "stops", read_stop)
    }

    fn stop_routes(&self, stop: StopId) -> Result<Vec<Route>, StoreError> {
        let sql = format!(
            "SELECT DISTINCT {ROUTE_COLUMNS} FROM routes r \
             JOIN trips t ON t.route_id = r.route_id \
             JOIN stop_times st ON st.trip_id = t.trip_id \
             WHERE st.stop_id = ?1 \
                OR st.stop_id IN (SELECT stop_id FROM stops WHERE parent_station = ?1) \
             ORDER BY r.route_id"
        );
        self.query_all(&sql, &stop.to_string(), "routes", read_route)
    }

    fn child_stops(&self, parent: StopId) -> Result<Vec<Stop>, StoreError> {
        let sql = format!(
            "SELECT {STOP_COLUMNS} FROM stops s \
             WHERE s.parent_station = ?1 \
             ORDER BY CAST(s.stop_id AS INTEGER)"
        );
        self.query_all(&sql, &parent.to_string(), "stops", read_stop)
    }

    fn transfers_from(&self, stop: StopId) -> Result<Vec<Transfer>, StoreError> {
        self.transfers("from_stop_id", stop)
    }

    fn transfers_to(&self, stop: StopId) -> Result<Vec<Transfer>, StoreError> {
        self.transfers("to_stop_id", stop)
    }

    fn calendar(&self, service_id: &str) -> Result<Option<ServiceCalendar>, StoreError> {
        let sql = "SELECT service_id, monday, tuesday, wednesday, thursday, friday, saturday, \
                          sunday, start_date, end_date \
                   FROM calendar WHERE service_id = ?1";
        let calendars = self.query_all(sql, service_id, "calendar", |f| {
            let mut days = [false; 7];
            for (i, day) in days.iter_mut().enumerate() {
                *day = f.flag(i + 1)?;
            }
            Ok(ServiceCalendar {
                service_id: f.required(0, "service_id")?,
                days,
                start_date: f.date(8, "start_date")?,
                end_date: f.date(9, "end_date")?,
            })
        })?;
        Ok(calendars.into_iter().next())
    }

    fn shape(&self, shape_id: &str) -> Result<Vec<ShapePoint>, StoreError> {
        let sql = "SELECT shape_id, shape_pt_lat, shape_pt_lon, shape_pt_sequence, \
                          shape_dist_traveled \
                   FROM shapes WHERE shape_id = ?1 \
                   ORDER BY CAST(shape_pt_sequence AS INTEGER)";
        self.query_all(sql, shape_id, "shapes", |f| {
            Ok(ShapePoint {
                shape_id: f.required(0, "shape_id")?,
                lat: f.number(1)?.unwrap_or_default(),
                lon: f.number(2)?.unwrap_or_default(),
                sequence: f.sequence(3)?,
                dist_traveled: f.number(4)?,
            })
        })
    }
}

fn collect<T>(
    mut rows: Rows<'_>,
    table: &'static str,
    read: impl Fn(&Fields<'_, '_>) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(read(&Fields { row, table })?);
    }
    Ok(out)
}

fn read_trip(f: &Fields<'_, '_>) -> Result<ScheduledTrip, StoreError> {
    let info = TripInfo {
        route_id: f.required(0, "route_id")?,
        service_id: f.required(1, "service_id")?,
        trip_id: f.required(2, "trip_id")?,
        direction_id: f.small(3)?,
        block_id: f.text(4)?,
        shape_id: f.text(5)?,
        direction: f.text(6)?,
        wheelchair_accessible: f.flag(7)?,
        schd_trip_id: f.text(8)?,
    };
    ScheduledTrip::from_info(info).map_err(|e| StoreError::malformed(f.table, e))
}

fn read_route(f: &Fields<'_, '_>) -> Result<Route, StoreError> {
    Ok(Route {
        id: f.required(0, "route_id")?,
        short_name: f.text(1)?,
        long_name: f.text(2)?,
        route_type: f.small(3)?,
        url: f.text(4)?,
        color: f.text(5)?,
        text_color: f.text(6)?,
    })
}

fn read_stop(f: &Fields<'_, '_>) -> Result<Stop, StoreError> {
    Ok(Stop {
        id: f.stop_id(0, "stop_id")?,
        code: f.text(1)?,
        name: f.text(2)?.unwrap_or_default(),
        description: f.text(3)?,
        lat: f.number(4)?.unwrap_or_default(),
        lon: f.number(5)?.unwrap_or_default(),
        location_type: f.small(6)?.unwrap_or(0),
        parent_station: f
            .text(7)?
            .map(|s| StopId::parse(&s))
            .transpose()
            .map_err(|e| StoreError::malformed(f.table, e))?,
        wheelchair_boarding: f.flag(8)?,
        synthesized: false,
    })
}

fn read_stop_time(f: &Fields<'_, '_>) -> Result<StopTimeEntry, StoreError> {
    Ok(StopTimeEntry {
        trip_id: f.required(0, "trip_id")?,
        arrival: f.time(1, "arrival_time")?,
        departure: f.time(2, "departure_time")?,
        stop_id: f.stop_id(3, "stop_id")?,
        sequence: f.sequence(4)?,
        headsign: f.text(5)?,
        pickup_type: f.small(6)?,
        dist_traveled: f.number(7)?,
    })
}

/// Lenient typed access to one result row.
struct Fields<'r, 's> {
    row: &'r Row<'s>,
    table: &'static str,
}

impl Fields<'_, '_> {
    fn malformed(&self, reason: String) -> StoreError {
        StoreError::Malformed {
            table: self.table,
            reason,
        }
    }

    /// Trimmed text, with blanks as `None`. Numbers are rendered as text.
    fn text(&self, idx: usize) -> Result<Option<String>, StoreError> {
        Ok(match self.row.get::<_, Value>(idx)? {
            Value::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Integer(i) => Some(i.to_string()),
            Value::Real(r) => Some(r.to_string()),
            Value::Null | Value::Blob(_) => None,
        })
    }

    fn required(&self, idx: usize, column: &str) -> Result<String, StoreError> {
        self.text(idx)?
            .ok_or_else(|| self.malformed(format!("missing {column}")))
    }

    fn number(&self, idx: usize) -> Result<Option<f64>, StoreError> {
        match self.row.get::<_, Value>(idx)? {
            Value::Integer(i) => Ok(Some(i as f64)),
            Value::Real(r) => Ok(Some(r)),
            Value::Text(s) if s.trim().is_empty() => Ok(None),
            Value::Text(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.malformed(format!("not a number: {s:?}"))),
            Value::Null | Value::Blob(_) => Ok(None),
        }
    }

    fn integer(&self, idx: usize) -> Result<Option<i64>, StoreError> {
        Ok(self.number(idx)?.map(|n| n as i64))
    }

    fn small(&self, idx: usize) -> Result<Option<u8>, StoreError> {
        self.integer(idx)?
            .map(|n| u8::try_from(n).map_err(|_| self.malformed(format!("out of range: {n}"))))
            .transpose()
    }

    fn sequence(&self, idx: usize) -> Result<u32, StoreError> {
        self.integer(idx)?
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| self.malformed("missing or negative sequence".to_string()))
    }

    fn flag(&self, idx: usize) -> Result<bool, StoreError> {
        Ok(self.integer(idx)? == Some(1))
    }

    fn stop_id(&self, idx: usize, column: &str) -> Result<StopId, StoreError> {
        let raw = self.required(idx, column)?;
        StopId::parse(&raw).map_err(|e| StoreError::malformed(self.table, e))
    }

    fn time(&self, idx: usize, column: &str) -> Result<ServiceTime, StoreError> {
        let raw = self.required(idx, column)?;
        ServiceTime::parse(&raw).map_err(|e| StoreError::malformed(self.table, e))
    }

    /// Calendar dates are stored as YYYYMMDD.
    fn date(&self, idx: usize, column: &str) -> Result<NaiveDate, StoreError> {
        let raw = self.required(idx, column)?;
        NaiveDate::parse_from_str(&raw, "%Y%m%d")
            .map_err(|_| self.malformed(format!("bad {column}: {raw:?}")))
    }
}
