// demos/select_race.rs
use conflux::conflated;
use conflux::select::{ClauseId, Selector, TrySelect};
use std::thread;

fn main() {
  println!("--- Select: two producers race, exactly one wins per round ---");
  let (tx_fast, rx_fast) = conflated::channel::<&'static str>();
  let (tx_slow, rx_slow) = conflated::channel::<&'static str>();

  for round in 1..=5 {
    let selector = Selector::new();

    thread::scope(|scope| {
      scope.spawn(|| {
        let mut clause = tx_fast.offer_clause("fast");
        match clause.try_select(&selector, ClauseId::new(0)).unwrap() {
          TrySelect::Succeeded(()) => println!("[fast] round {}: delivered", round),
          _ => println!(
            "[fast] round {}: lost, kept {:?}",
            round,
            clause.into_value()
          ),
        }
      });
      scope.spawn(|| {
        let mut clause = tx_slow.offer_clause("slow");
        match clause.try_select(&selector, ClauseId::new(1)).unwrap() {
          TrySelect::Succeeded(()) => println!("[slow] round {}: delivered", round),
          _ => println!(
            "[slow] round {}: lost, kept {:?}",
            round,
            clause.into_value()
          ),
        }
      });
    });

    let winner = selector.winner().expect("one clause always wins");
    let delivered = if winner == ClauseId::new(0) {
      rx_fast.try_recv().unwrap()
    } else {
      rx_slow.try_recv().unwrap()
    };
    println!(
      "[main] round {}: clause {:?} won with {:?}\n",
      round, winner, delivered
    );
  }
}
