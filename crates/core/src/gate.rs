//! Audio-Freigabe aus Sicht der Steuerung
//!
//! Die Steuerung kommandiert das Podiumsmikrofon nur ueber diesen Trait.
//! Aufrufe sind fire-and-forget: Hardwarefehler kommen spaeter als
//! Ereignis zurueck, nie als Rueckgabewert.

/// Schaltet das Podiumsmikrofon frei oder kappt es
pub trait AudioGate: Send {
    /// Audio freigeben
    fn open(&mut self);

    /// Audio kappen
    fn cut(&mut self);
}

impl<T: AudioGate + ?Sized> AudioGate for Box<T> {
    fn open(&mut self) {
        (**self).open()
    }

    fn cut(&mut self) {
        (**self).cut()
    }
}
