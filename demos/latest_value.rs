// demos/latest_value.rs
use conflux::conflated;
use std::thread;
use std::time::Duration;

fn main() {
  println!("--- Conflated: fast sensor, slow UI ---");
  let (tx, rx) = conflated::channel::<u32>();

  let sensor = thread::spawn(move || {
    for reading in 0..50 {
      // Never blocks; an unread value is simply overwritten.
      tx.send(reading).unwrap();
      thread::sleep(Duration::from_millis(2));
    }
    println!("[Sensor] Done; closing the feed.");
    tx.close();
  });

  let mut redraws = 0u32;
  loop {
    match rx.recv() {
      Ok(reading) => {
        redraws += 1;
        println!("[UI] Showing latest reading: {}", reading);
        thread::sleep(Duration::from_millis(20)); // slow redraw
      }
      Err(closed) => {
        assert!(closed.is_graceful());
        println!("[UI] Sensor closed the feed.");
        break;
      }
    }
  }
  println!("[UI] Redrew {} times for 50 readings.", redraws);
  sensor.join().unwrap();
}
