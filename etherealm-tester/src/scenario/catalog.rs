use anyhow::{Context, Result, ensure};
use etherealm_game::constants::{DAILY_QUEST_COUNT, SKILL_POINTS_PER_LEVEL};
use etherealm_game::social::LeaveOutcome;
use etherealm_game::{GameDay, TokenAmount};
use std::sync::Arc;

use super::ScenarioCtx;
use crate::player::{RunMetrics, START_DAY, World, wallet};

fn day(offset: u32) -> GameDay {
    GameDay(START_DAY.0.saturating_add(offset))
}

fn trace(ctx: &ScenarioCtx, message: &str) {
    if ctx.verbose {
        println!("     · {message}");
    }
    log::debug!("{message}");
}

pub(super) async fn smoke(ctx: &ScenarioCtx) -> Result<RunMetrics> {
    let world = World::new(Arc::clone(&ctx.data));
    let mut player = world.player(1, ctx.seed);
    player.mint(&world, "Smokey").await?;
    ensure!(
        player.client.roster().characters.len() == 1,
        "minting should add exactly one character"
    );
    player.play_day(START_DAY)?;

    ensure!(player.client.daily().total_claims == 1, "daily reward not claimed");
    ensure!(
        player.client.quests().active.len() == DAILY_QUEST_COUNT,
        "expected {DAILY_QUEST_COUNT} daily quests"
    );
    ensure!(
        player.client.leaderboard().rank_of(&wallet(1)).is_some(),
        "score missing from the leaderboard"
    );
    Ok(player.metrics)
}

pub(super) fn daily_streak(ctx: &ScenarioCtx) -> Result<RunMetrics> {
    let world = World::new(Arc::clone(&ctx.data));
    let mut player = world.guest(ctx.seed);
    let days = ctx.days.max(2);
    let skipped = (days >= 4).then_some(days / 2);

    for offset in 0..days {
        if Some(offset) == skipped {
            trace(ctx, &format!("skipping day {offset}"));
            continue;
        }
        player.play_day(day(offset))?;
    }
    let last = day(days - 1);
    ensure!(
        player.client.claim_daily(last).is_err(),
        "a second claim on the same day must be rejected"
    );

    let daily = player.client.daily();
    let claimed = days - u32::from(skipped.is_some());
    ensure!(
        daily.total_claims == claimed,
        "expected {claimed} claims, found {}",
        daily.total_claims
    );
    let (streak, best) = match skipped {
        Some(skip) => (days - skip - 1, skip.max(days - skip - 1)),
        None => (days, days),
    };
    ensure!(
        daily.streak == streak,
        "streak should restart after the missed day: expected {streak}, found {}",
        daily.streak
    );
    ensure!(daily.best_streak == best, "best streak should be {best}, found {}", daily.best_streak);
    ensure!(player.client.roster().characters.is_empty(), "guests own no characters");
    Ok(player.metrics)
}

pub(super) async fn grinder(ctx: &ScenarioCtx) -> Result<RunMetrics> {
    let world = World::new(Arc::clone(&ctx.data));
    let mut player = world.player(1, ctx.seed);
    let class = player.mint(&world, "Grinder").await?;
    trace(ctx, &format!("minted a {class:?}"));

    for offset in 0..ctx.days {
        player
            .play_day(day(offset))
            .with_context(|| format!("day {offset}"))?;
    }

    let hero = player
        .client
        .roster()
        .active()
        .cloned()
        .context("active character lost")?;
    let book = player.client.skills();
    ensure!(
        book.total_points() == (hero.level - 1) * SKILL_POINTS_PER_LEVEL,
        "skill points {} do not match level {}",
        book.total_points(),
        hero.level
    );
    // Every battle grants at least 10 XP and a day has at least 3 battles.
    if ctx.days >= 4 {
        ensure!(hero.level > 1, "no level gained in {} days", ctx.days);
    }
    if ctx.days > 0 {
        ensure!(
            !player.client.equipment().slots.is_empty(),
            "starting gold should buy some gear"
        );
        ensure!(
            player.client.leaderboard().rank_of(&wallet(1)) == Some(1),
            "the only player should rank first"
        );
    }
    Ok(player.metrics)
}

pub(super) async fn social(ctx: &ScenarioCtx) -> Result<RunMetrics> {
    let world = World::new(Arc::clone(&ctx.data));
    let mut alice = world.player(1, ctx.seed);
    let mut bob = world.player(2, ctx.seed);
    alice.mint(&world, "Alice").await?;
    bob.mint(&world, "Bob").await?;

    ensure!(
        !alice.client.send_friend_request(wallet(2), START_DAY)?,
        "first request should stay pending"
    );
    ensure!(
        bob.client.send_friend_request(wallet(1), START_DAY)?,
        "crossing requests should make friends"
    );
    let guild = alice.client.create_guild("Moonlit Order", "moon", START_DAY)?;
    bob.client.join_guild(guild, START_DAY)?;
    trace(ctx, &format!("guild #{guild} formed"));

    for offset in 0..ctx.days.max(1) {
        alice.play_day(day(offset))?;
        bob.play_day(day(offset))?;
    }

    ensure!(
        alice.client.friends().is_friend(&wallet(2)) && bob.client.friends().is_friend(&wallet(1)),
        "friendship should be mutual"
    );
    let directory = alice.client.guilds();
    let shared = directory.get(guild).context("guild vanished")?;
    ensure!(shared.tag == "MOON", "guild tags are upper-cased");
    ensure!(shared.members.len() == 2, "both players should be members");
    let wins = alice.metrics.wins + bob.metrics.wins;
    ensure!(wins == 0 || shared.xp > 0, "won battles should feed guild XP");
    ensure!(alice.client.leaderboard().entries.len() == 2, "both players should be ranked");

    ensure!(
        alice.client.leave_guild()? == LeaveOutcome::LeadershipPassed(wallet(2)),
        "leadership should pass to the remaining member"
    );
    ensure!(
        bob.client.leave_guild()? == LeaveOutcome::Disbanded,
        "last member leaving disbands the guild"
    );

    let mut metrics = alice.metrics;
    metrics.battles += bob.metrics.battles;
    metrics.wins = wins;
    metrics.quests_claimed += bob.metrics.quests_claimed;
    Ok(metrics)
}

pub(super) async fn chain_mint(ctx: &ScenarioCtx) -> Result<RunMetrics> {
    let world = World::new(Arc::clone(&ctx.data));
    let mut player = world.player(1, ctx.seed);
    player.mint(&world, "Minty").await?;

    player.client.level_up_on_chain(&world.chain).await?;
    player.client.evolve_on_chain(&world.chain).await?;
    let hero = player.client.roster().active().cloned().context("no active character")?;
    ensure!(hero.level == 2, "chain level should sync into the roster");
    ensure!(hero.generation == 1, "evolution should sync into the roster");

    let amount = TokenAmount::from_base_units(250);
    player.client.send_tokens(&world.chain, wallet(2), amount).await?;
    ensure!(
        world.chain.token_balance(&wallet(1)) == World::STARTING_TOKENS - 250
            && world.chain.token_balance(&wallet(2)) == World::STARTING_TOKENS + 250,
        "token transfer should move balances"
    );

    world.chain.reject_next_write();
    ensure!(
        player.client.level_up_on_chain(&world.chain).await.is_err(),
        "a dismissed wallet prompt should fail the call"
    );
    let expected = world.data.chain.chain_id;
    world.chain.set_chain_id(expected + 1);
    ensure!(
        player.mint(&world, "Wrongnet").await.is_err(),
        "minting on the wrong chain should fail"
    );
    world.chain.set_chain_id(expected);
    ensure!(world.chain.tx_count() == 4, "expected 4 mined transactions, found {}", world.chain.tx_count());
    ensure!(
        player.client.roster().active().map(|c| c.level) == Some(2),
        "failed writes must not touch the roster"
    );

    for offset in 0..ctx.days {
        player.play_day(day(offset))?;
    }
    Ok(player.metrics)
}
