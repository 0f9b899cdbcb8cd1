use etherealm_game::GameDay;

/// The current UTC game day according to the browser clock.
#[must_use]
pub fn today() -> GameDay {
    day_at(js_sys::Date::now())
}

/// Game day for a `Date.now()`-style millisecond timestamp.
#[must_use]
pub fn day_at(millis: f64) -> GameDay {
    if !millis.is_finite() {
        return GameDay(0);
    }
    #[allow(clippy::cast_possible_truncation)]
    GameDay::from_timestamp_ms(millis.floor() as i64)
}
